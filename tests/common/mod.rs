use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::TempDir;

use authrelay::auth::navigator::Navigator;
use authrelay::auth::store::MemoryTokenStore;
use authrelay::client::ApiClient;
use authrelay::config::Config;

/// Navigator that counts redirect invocations instead of navigating.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    redirects: AtomicUsize,
}

#[allow(dead_code)]
impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times the client asked for a redirect to login.
    pub fn redirect_count(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl Navigator for RecordingNavigator {
    fn redirect_to_login(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}

/// Builds a client pointed at a wiremock server, over a memory store and
/// a recording navigator.
#[allow(dead_code)]
pub fn test_client(
    server_uri: &str,
    store: Arc<MemoryTokenStore>,
    navigator: Arc<RecordingNavigator>,
) -> ApiClient {
    let mut config = Config::default();
    config.api.base_url = server_uri.to_string();
    config.auth.token_store = "memory".to_string();
    ApiClient::new(config, store, navigator).expect("client construction")
}

/// Writes a config file into a fresh temp dir and returns both.
#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
