//! Session authentication subsystem
//!
//! Everything the client needs to keep a token-based session alive:
//! credential persistence, single-flight refresh coordination, and the
//! hook fired when the session is beyond saving.
//!
//! # Module Layout
//!
//! - [`coordinator`] -- Single-flight refresh arbitration with queued
//!   waiter release
//! - [`store`]       -- `TokenStore` trait plus in-memory and OS-keyring
//!   backends
//! - [`navigator`]   -- Redirect hook invoked on unrecoverable auth
//!   failure

pub mod coordinator;
pub mod navigator;
pub mod store;

pub use coordinator::{
    RefreshCoordinator, RefreshFailure, RefreshOutcome, RefreshPermit, RefreshRole,
};
pub use navigator::{Navigator, NoopNavigator};
pub use store::{open_store, KeyringTokenStore, MemoryTokenStore, TokenPair, TokenStore};
