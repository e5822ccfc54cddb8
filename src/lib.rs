//! authrelay - authenticated API client library
//!
//! This library provides an asynchronous HTTP client for token-based JSON
//! APIs: it attaches the current bearer credential to outgoing requests,
//! detects authorization failures, performs a single in-flight refresh of
//! the credential pair, and replays queued requests with the new
//! credential once refresh completes.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `client`: The request pipeline (attach, dispatch, detect, retry) and
//!   session operations (login, logout, refresh)
//! - `auth`: Refresh coordination, credential stores, and the navigation
//!   hook fired on unrecoverable auth failure
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use authrelay::auth::navigator::NoopNavigator;
//! use authrelay::auth::store::MemoryTokenStore;
//! use authrelay::client::ApiClient;
//! use authrelay::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     config.validate()?;
//!
//!     let client = ApiClient::new(
//!         config,
//!         Arc::new(MemoryTokenStore::new()),
//!         Arc::new(NoopNavigator),
//!     )?;
//!
//!     // An expired access token is renewed transparently on first use.
//!     let members: Vec<serde_json::Value> = client.get("/members").await?;
//!     println!("{} members", members.len());
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;

// Re-export commonly used types
pub use auth::{Navigator, RefreshCoordinator, TokenPair, TokenStore};
pub use client::auth::{LoginCredentials, User};
pub use client::{ApiClient, ApiRequest};
pub use config::Config;
pub use error::{AuthRelayError, Result};
