//! Error types for authrelay
//!
//! This module defines all error types used throughout the crate,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for authrelay operations
///
/// This enum encompasses all possible errors that can occur while
/// dispatching requests, coordinating token refresh, persisting
/// credentials, and loading configuration.
#[derive(Error, Debug)]
pub enum AuthRelayError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network or connection failures, never classified as auth failures
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server rejected the request credentials (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A 401 after the request was already retried, or a failure from
    /// the refresh endpoint itself; the session cannot be recovered
    #[error("Authentication expired: {0}")]
    RefreshExhausted(String),

    /// A refresh was required but no refresh token is stored
    #[error("No refresh token available")]
    NoRefreshToken,

    /// Non-auth HTTP error responses from the API
    #[error("API error: status={status}, {message}")]
    Api {
        /// HTTP status code returned by the server
        status: u16,
        /// Response body text, if any
        message: String,
    },

    /// Credential storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

impl AuthRelayError {
    /// Whether this error means the session is gone and the user must
    /// log in again
    ///
    /// # Returns
    ///
    /// Returns `true` for refresh exhaustion and missing-refresh-token
    /// errors, `false` for everything else.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            AuthRelayError::RefreshExhausted(_) | AuthRelayError::NoRefreshToken
        )
    }
}

/// Result type alias for authrelay operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = AuthRelayError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_unauthorized_error_display() {
        let error = AuthRelayError::Unauthorized("invalid credentials".to_string());
        assert_eq!(error.to_string(), "Unauthorized: invalid credentials");
    }

    #[test]
    fn test_refresh_exhausted_error_display() {
        let error = AuthRelayError::RefreshExhausted("refresh rejected".to_string());
        assert_eq!(error.to_string(), "Authentication expired: refresh rejected");
    }

    #[test]
    fn test_no_refresh_token_error_display() {
        let error = AuthRelayError::NoRefreshToken;
        assert_eq!(error.to_string(), "No refresh token available");
    }

    #[test]
    fn test_api_error_display() {
        let error = AuthRelayError::Api {
            status: 503,
            message: "service unavailable".to_string(),
        };
        let s = error.to_string();
        assert!(s.contains("status=503"));
        assert!(s.contains("service unavailable"));
    }

    #[test]
    fn test_storage_error_display() {
        let error = AuthRelayError::Storage("keyring locked".to_string());
        assert_eq!(error.to_string(), "Storage error: keyring locked");
    }

    #[test]
    fn test_requires_login_classification() {
        assert!(AuthRelayError::RefreshExhausted("expired".to_string()).requires_login());
        assert!(AuthRelayError::NoRefreshToken.requires_login());
        assert!(!AuthRelayError::Unauthorized("nope".to_string()).requires_login());
        assert!(!AuthRelayError::Config("bad".to_string()).requires_login());
        assert!(!AuthRelayError::Api {
            status: 500,
            message: "boom".to_string()
        }
        .requires_login());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: AuthRelayError = io_error.into();
        assert!(matches!(error, AuthRelayError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_str = "{invalid json}";
        let json_error = serde_json::from_str::<serde_json::Value>(json_str).unwrap_err();
        let error: AuthRelayError = json_error.into();
        assert!(matches!(error, AuthRelayError::Serialization(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_str = "invalid: : yaml";
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>(yaml_str).unwrap_err();
        let error: AuthRelayError = yaml_error.into();
        assert!(matches!(error, AuthRelayError::Yaml(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AuthRelayError>();
    }
}
