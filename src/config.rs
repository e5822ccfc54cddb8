//! Configuration management for authrelay
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{AuthRelayError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Main configuration structure for authrelay
///
/// This structure holds everything needed to construct a client:
/// API endpoint settings and authentication behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API endpoint configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,
}

/// API endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL all request paths are joined onto, e.g.
    /// `http://localhost:8080/api/v1`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout applied to every request, including refresh calls (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "http://localhost:8080/api/v1".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("authrelay/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl ApiConfig {
    /// Build a full endpoint URL from a request path
    ///
    /// Joins the path onto the base URL, tolerating a trailing slash on
    /// the base and requiring a leading slash on the path.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Path of the login endpoint, joined onto the API base
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Path of the refresh endpoint, joined onto the API base
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,

    /// Which credential store backs the session: "keyring" (survives
    /// restarts) or "memory" (lost at process exit)
    #[serde(default = "default_token_store")]
    pub token_store: String,

    /// Service name used to namespace keyring entries
    #[serde(default = "default_keyring_service")]
    pub keyring_service: String,
}

fn default_login_path() -> String {
    "/auth/login".to_string()
}

fn default_refresh_path() -> String {
    "/auth/refresh".to_string()
}

fn default_token_store() -> String {
    "keyring".to_string()
}

fn default_keyring_service() -> String {
    "authrelay".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_path: default_login_path(),
            refresh_path: default_refresh_path(),
            token_store: default_token_store(),
            keyring_service: default_keyring_service(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with the standard precedence chain
    ///
    /// Reads the YAML file at `path` if it exists, otherwise the user
    /// config directory, otherwise defaults; then applies environment
    /// variables and finally CLI overrides.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    /// * `cli` - Parsed command line arguments
    ///
    /// # Returns
    ///
    /// Returns the effective configuration
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else if let Some(user_path) = Self::user_config_path().filter(|p| p.exists()) {
            Self::from_file(&user_path.to_string_lossy())?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    /// Default per-user config file location, if one can be determined
    pub fn user_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "authrelay")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AuthRelayError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| AuthRelayError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("AUTHRELAY_API_BASE") {
            self.api.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("AUTHRELAY_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.api.timeout_seconds = value;
            }
        }

        if let Ok(store) = std::env::var("AUTHRELAY_TOKEN_STORE") {
            self.auth.token_store = store;
        }

        if let Ok(service) = std::env::var("AUTHRELAY_KEYRING_SERVICE") {
            self.auth.keyring_service = service;
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(base) = &cli.api_base {
            self.api.base_url = base.clone();
        }

        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
    }

    /// Validate the configuration
    ///
    /// Ensures the base URL parses, the timeout is sane, endpoint paths
    /// are absolute, and the store kind is known.
    ///
    /// # Returns
    ///
    /// Returns Ok if configuration is valid
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.is_empty() {
            return Err(AuthRelayError::Config("api.base_url cannot be empty".to_string()).into());
        }

        if Url::parse(&self.api.base_url).is_err() {
            return Err(AuthRelayError::Config(format!(
                "api.base_url is not a valid URL: {}",
                self.api.base_url
            ))
            .into());
        }

        if self.api.timeout_seconds == 0 {
            return Err(AuthRelayError::Config(
                "api.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        for (name, path) in [
            ("auth.login_path", &self.auth.login_path),
            ("auth.refresh_path", &self.auth.refresh_path),
        ] {
            if !path.starts_with('/') {
                return Err(AuthRelayError::Config(format!(
                    "{} must start with '/': {}",
                    name, path
                ))
                .into());
            }
        }

        let valid_stores = ["keyring", "memory"];
        if !valid_stores.contains(&self.auth.token_store.as_str()) {
            return Err(AuthRelayError::Config(format!(
                "Invalid token store: {}. Must be one of: {}",
                self.auth.token_store,
                valid_stores.join(", ")
            ))
            .into());
        }

        if self.auth.keyring_service.is_empty() {
            return Err(
                AuthRelayError::Config("auth.keyring_service cannot be empty".to_string()).into(),
            );
        }

        Ok(())
    }
}
