//! Credential persistence for the client session
//!
//! This module defines the [`TokenStore`] trait the refresh coordinator
//! reads and writes through, plus the two shipped backends: an in-memory
//! store whose contents die with the process, and an OS-keyring store
//! (Keychain on macOS, Secret Service on Linux, Windows Credential
//! Manager on Windows) whose contents survive restarts.
//!
//! The pair is serialized to JSON before keyring storage and deserialized
//! on load. Which backend a session uses is a configuration choice; the
//! coordinator behaves identically over both.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::AuthConfig;
use crate::error::{AuthRelayError, Result};

// ---------------------------------------------------------------------------
// TokenPair
// ---------------------------------------------------------------------------

/// The current access/refresh credential pair.
///
/// Both tokens are opaque strings owned by the server; the client never
/// inspects them. This is also the JSON payload shape persisted by
/// [`KeyringTokenStore`].
///
/// # Examples
///
/// ```
/// use authrelay::auth::store::TokenPair;
///
/// let pair = TokenPair::new("access_abc", "refresh_xyz");
/// assert_eq!(pair.access, "access_abc");
/// assert_eq!(pair.refresh, "refresh_xyz");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived credential attached to API requests.
    pub access: String,

    /// Longer-lived credential used solely to obtain a new pair.
    pub refresh: String,
}

impl TokenPair {
    /// Creates a pair from anything string-like.
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// TokenStore
// ---------------------------------------------------------------------------

/// Storage interface consumed by the client and the refresh coordinator.
///
/// Implementations must be safe to share across tasks; all methods take
/// `&self` and synchronize internally. The coordinator only ever writes
/// through [`set_tokens`](TokenStore::set_tokens) and
/// [`clear`](TokenStore::clear); it never mutates a loaded pair in place.
pub trait TokenStore: Send + Sync {
    /// Returns the current access token, if a session exists.
    fn access_token(&self) -> Result<Option<String>>;

    /// Returns the current refresh token, if a session exists.
    fn refresh_token(&self) -> Result<Option<String>>;

    /// Persists a new credential pair, replacing any previous one.
    fn set_tokens(&self, access: &str, refresh: &str) -> Result<()>;

    /// Removes the stored pair. A no-op when nothing is stored.
    fn clear(&self) -> Result<()>;
}

/// Builds the credential store selected by the configuration.
///
/// # Errors
///
/// Returns [`AuthRelayError::Config`] when the configured store kind is
/// unknown (validation normally rejects this earlier).
pub fn open_store(config: &AuthConfig) -> Result<Arc<dyn TokenStore>> {
    match config.token_store.as_str() {
        "memory" => Ok(Arc::new(MemoryTokenStore::new())),
        "keyring" => Ok(Arc::new(KeyringTokenStore::new(&config.keyring_service))),
        other => {
            Err(AuthRelayError::Config(format!("Invalid token store: {}", other)).into())
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryTokenStore
// ---------------------------------------------------------------------------

/// In-memory credential store.
///
/// Holds the pair behind a mutex for the lifetime of the process. Used by
/// tests and by embedders that manage persistence themselves.
///
/// # Examples
///
/// ```
/// use authrelay::auth::store::{MemoryTokenStore, TokenStore};
///
/// let store = MemoryTokenStore::new();
/// assert!(store.access_token().unwrap().is_none());
///
/// store.set_tokens("access", "refresh").unwrap();
/// assert_eq!(store.access_token().unwrap().as_deref(), Some("access"));
///
/// store.clear().unwrap();
/// assert!(store.refresh_token().unwrap().is_none());
/// ```
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    pair: Mutex<Option<TokenPair>>,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with a pair.
    pub fn with_tokens(access: &str, refresh: &str) -> Self {
        Self {
            pair: Mutex::new(Some(TokenPair::new(access, refresh))),
        }
    }

    fn locked(&self) -> Result<MutexGuard<'_, Option<TokenPair>>> {
        self.pair
            .lock()
            .map_err(|_| AuthRelayError::Storage("credential store lock poisoned".to_string()).into())
    }
}

impl TokenStore for MemoryTokenStore {
    fn access_token(&self) -> Result<Option<String>> {
        Ok(self.locked()?.as_ref().map(|p| p.access.clone()))
    }

    fn refresh_token(&self) -> Result<Option<String>> {
        Ok(self.locked()?.as_ref().map(|p| p.refresh.clone()))
    }

    fn set_tokens(&self, access: &str, refresh: &str) -> Result<()> {
        *self.locked()? = Some(TokenPair::new(access, refresh));
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.locked()? = None;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// KeyringTokenStore
// ---------------------------------------------------------------------------

/// Credential store backed by the OS native keyring.
///
/// The pair is stored as a single JSON entry under the configured service
/// name, so one machine can hold sessions for several deployments side by
/// side by giving each a distinct service name.
///
/// # Examples
///
/// ```no_run
/// use authrelay::auth::store::{KeyringTokenStore, TokenStore};
///
/// let store = KeyringTokenStore::new("authrelay");
/// store.set_tokens("access", "refresh").unwrap();
/// assert!(store.access_token().unwrap().is_some());
/// ```
pub struct KeyringTokenStore {
    service: String,
}

impl KeyringTokenStore {
    const ENTRY_USER: &'static str = "session";

    /// Creates a store namespaced under `service`.
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, Self::ENTRY_USER)
            .map_err(|e| AuthRelayError::Keyring(e).into())
    }

    fn load_pair(&self) -> Result<Option<TokenPair>> {
        match self.entry()?.get_password() {
            Ok(json_str) => {
                let pair: TokenPair = serde_json::from_str(&json_str)?;
                Ok(Some(pair))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(AuthRelayError::Keyring(e).into()),
        }
    }
}

impl TokenStore for KeyringTokenStore {
    fn access_token(&self) -> Result<Option<String>> {
        Ok(self.load_pair()?.map(|p| p.access))
    }

    fn refresh_token(&self) -> Result<Option<String>> {
        Ok(self.load_pair()?.map(|p| p.refresh))
    }

    fn set_tokens(&self, access: &str, refresh: &str) -> Result<()> {
        let json_str = serde_json::to_string(&TokenPair::new(access, refresh))?;
        self.entry()?
            .set_password(&json_str)
            .map_err(|e| AuthRelayError::Keyring(e).into())
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_password() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(AuthRelayError::Keyring(e).into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
