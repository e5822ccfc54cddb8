//! Session operations: login, logout, manual refresh
//!
//! These extend [`ApiClient`] with the calls that open and close a
//! session. Login and the refresh exchange use the bypass path: they go
//! straight to the server without bearer attachment or the failure
//! detector, since a 401 from either means bad credentials, not an
//! expired access token.

use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::error::{AuthRelayError, Result};

/// Login credentials sent to the login endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct LoginCredentials {
    /// Account username.
    pub username: String,

    /// Account password.
    pub password: String,
}

impl LoginCredentials {
    /// Creates credentials from anything string-like.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// The authenticated account, as returned by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Server-assigned account identifier.
    pub id: String,

    /// Account username.
    pub username: String,

    /// Display name.
    pub name: String,

    /// Account role, when the server assigns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Avatar URL, when the account has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
    user: User,
}

impl ApiClient {
    /// Opens a session: exchanges credentials for a token pair and
    /// persists it to the credential store.
    ///
    /// Uses the bypass path; a 401 here surfaces as
    /// [`AuthRelayError::Unauthorized`] (invalid credentials) and never
    /// enters the refresh protocol.
    ///
    /// # Returns
    ///
    /// The logged-in [`User`] on success.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<User> {
        let url = self.config.api.endpoint(&self.config.auth.login_path);

        tracing::info!(username = %credentials.username, "logging in");
        let response = self
            .http
            .post(&url)
            .json(credentials)
            .send()
            .await
            .map_err(AuthRelayError::Transport)?;

        let response = self.check_status(response).await?;
        let parsed: LoginResponse = response.json().await.map_err(AuthRelayError::Transport)?;

        self.store
            .set_tokens(&parsed.access_token, &parsed.refresh_token)?;
        tracing::info!(username = %parsed.user.username, "login succeeded");

        Ok(parsed.user)
    }

    /// Closes the session locally: clears the stored pair and sends the
    /// navigator to the login entry point. No network call is made.
    pub fn logout(&self) -> Result<()> {
        self.store.clear()?;
        self.navigator.redirect_to_login();
        tracing::info!("logged out, credentials cleared");
        Ok(())
    }

    /// Forces a credential refresh, e.g. at startup with a stored pair.
    ///
    /// Goes through the coordinator exactly like an intercepted 401, so
    /// an explicit refresh racing an implicit one still produces a single
    /// network call.
    ///
    /// # Returns
    ///
    /// The new access token on success.
    pub async fn refresh(&self) -> Result<String> {
        self.coordinated_refresh().await
    }

    /// Whether the store currently holds an access token.
    ///
    /// A `true` here does not guarantee the token is still accepted by
    /// the server; an expired one is renewed transparently on first use.
    pub fn authenticated(&self) -> bool {
        matches!(self.store.access_token(), Ok(Some(_)))
    }
}
