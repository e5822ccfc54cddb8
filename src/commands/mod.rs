/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.
Each handler is a small function over the library components: it builds
an [`ApiClient`] from the effective configuration and performs one
session operation or authenticated call.
*/

use std::str::FromStr;
use std::sync::Arc;

use reqwest::Method;

use crate::auth::navigator::Navigator;
use crate::auth::store::open_store;
use crate::client::auth::LoginCredentials;
use crate::client::{ApiClient, ApiRequest};
use crate::config::Config;
use crate::error::{AuthRelayError, Result};

/// Navigator used by the CLI: "redirecting to login" means telling the
/// user how to start a new session.
#[derive(Debug, Clone, Copy, Default)]
pub struct CliNavigator;

impl Navigator for CliNavigator {
    fn redirect_to_login(&self) {
        eprintln!("Session expired. Run `authrelay login` to sign in again.");
    }
}

/// Builds a client session from the effective configuration.
///
/// The credential store backend (keyring or memory) comes from
/// `auth.token_store`.
pub fn build_client(config: Config) -> Result<ApiClient> {
    let store = open_store(&config.auth)?;
    ApiClient::new(config, store, Arc::new(CliNavigator))
}

/// Log in and persist the session tokens
///
/// # Arguments
///
/// * `config` - Effective configuration
/// * `username` - Account username
/// * `password` - Account password
pub async fn login(config: Config, username: String, password: String) -> Result<()> {
    let client = build_client(config)?;
    let user = client
        .login(&LoginCredentials::new(username, password))
        .await?;

    println!("Logged in as {} ({})", user.name, user.username);
    if let Some(role) = &user.role {
        println!("Role: {}", role);
    }
    Ok(())
}

/// Show whether a session is currently stored
pub fn status(config: Config) -> Result<()> {
    let client = build_client(config)?;
    if client.authenticated() {
        println!("Session: active (access token stored)");
    } else {
        println!("Session: none. Run `authrelay login` to sign in.");
    }
    Ok(())
}

/// Perform an authenticated request and print the JSON response
///
/// # Arguments
///
/// * `config` - Effective configuration
/// * `method` - HTTP method name, e.g. "GET"
/// * `path` - Request path joined onto the API base
/// * `data` - Optional JSON body
pub async fn call(
    config: Config,
    method: String,
    path: String,
    data: Option<String>,
) -> Result<()> {
    let method = Method::from_str(&method.to_uppercase())
        .map_err(|_| AuthRelayError::Config(format!("Invalid HTTP method: {}", method)))?;

    let mut request = ApiRequest::new(method, path);
    if let Some(raw) = data {
        let body: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| AuthRelayError::Config(format!("Invalid JSON body: {}", e)))?;
        request = request.with_body(body);
    }

    let client = build_client(config)?;
    let response: serde_json::Value = client.execute(request).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// Force a refresh of the stored credential pair
pub async fn refresh(config: Config) -> Result<()> {
    let client = build_client(config)?;
    client.refresh().await?;
    println!("Credentials refreshed.");
    Ok(())
}

/// Clear the stored session
pub fn logout(config: Config) -> Result<()> {
    let client = build_client(config)?;
    client.logout()?;
    println!("Logged out.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> Config {
        let mut config = Config::default();
        config.auth.token_store = "memory".to_string();
        config
    }

    #[test]
    fn test_build_client_with_memory_store() {
        let client = build_client(memory_config()).unwrap();
        assert!(!client.authenticated());
    }

    #[test]
    fn test_status_with_empty_store() {
        assert!(status(memory_config()).is_ok());
    }

    #[tokio::test]
    async fn test_call_rejects_invalid_method() {
        let result = call(
            memory_config(),
            "NOT A METHOD".to_string(),
            "/members".to_string(),
            None,
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_call_rejects_invalid_json_body() {
        let result = call(
            memory_config(),
            "POST".to_string(),
            "/members".to_string(),
            Some("{not json}".to_string()),
        )
        .await;
        assert!(result.is_err());
    }
}
