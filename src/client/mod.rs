//! Authenticated API client with transparent token refresh
//!
//! [`ApiClient`] is the crate's front door. Every request goes through a
//! fixed pipeline: the current access token is attached as a bearer
//! header, the request is dispatched, and the response runs through a
//! failure detector. A 401 on a first attempt enters the single-flight
//! refresh protocol (see [`crate::auth::coordinator`]) and the request is
//! resubmitted once with the fresh token, invisibly to the caller. A 401
//! on an already-retried request, or from the refresh endpoint itself,
//! ends the session instead: the store is cleared, the navigator fires,
//! and the error propagates.
//!
//! The refresh exchange and the session operations in [`auth`] use a
//! bypass path on the same underlying `reqwest` client: they share the
//! connection pool but never re-enter the detector, which bounds every
//! episode to exactly one refresh call.

pub mod auth;

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::coordinator::{RefreshCoordinator, RefreshFailure, RefreshRole};
use crate::auth::navigator::Navigator;
use crate::auth::store::{TokenPair, TokenStore};
use crate::config::Config;
use crate::error::{AuthRelayError, Result};

// ---------------------------------------------------------------------------
// ApiRequest
// ---------------------------------------------------------------------------

/// A captured outbound request.
///
/// Holds everything needed to build the HTTP request, so the pipeline can
/// resubmit it after a refresh without the caller's involvement.
///
/// # Examples
///
/// ```
/// use authrelay::client::ApiRequest;
/// use reqwest::Method;
/// use serde_json::json;
///
/// let request = ApiRequest::new(Method::POST, "/members")
///     .with_body(json!({ "name": "ada" }));
/// assert_eq!(request.path, "/members");
/// assert!(request.body.is_some());
/// ```
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,

    /// Request path joined onto the configured API base, e.g. `/members`.
    pub path: String,

    /// Optional JSON body.
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    /// Creates a request with no body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    /// Attaches a JSON body.
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Which attempt of a request is being dispatched.
///
/// Threaded explicitly through the pipeline instead of marking the
/// request object; a request is retried at most once per refresh episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Initial,
    Retried,
}

/// Failure detector verdict for a dispatched response.
enum Verdict {
    /// Hand the response on to status checking and the caller.
    Deliver(reqwest::Response),

    /// Run the refresh protocol and resubmit with fresh credentials.
    RefreshAndRetry,
}

// ---------------------------------------------------------------------------
// Refresh wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct RefreshRequest {
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    refresh_token: String,
}

// ---------------------------------------------------------------------------
// ApiClient
// ---------------------------------------------------------------------------

/// HTTP client for a token-authenticated JSON API.
///
/// Cloning is cheap and clones share the same session: the same
/// credential store, navigator, and refresh coordinator. Concurrent
/// requests from any number of clones still produce at most one refresh
/// call per expiry.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use authrelay::auth::navigator::NoopNavigator;
/// use authrelay::auth::store::MemoryTokenStore;
/// use authrelay::client::ApiClient;
/// use authrelay::config::Config;
///
/// # async fn example() -> authrelay::error::Result<()> {
/// let client = ApiClient::new(
///     Config::default(),
///     Arc::new(MemoryTokenStore::new()),
///     Arc::new(NoopNavigator),
/// )?;
/// let members: Vec<serde_json::Value> = client.get("/members").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Arc<Config>,
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    coordinator: Arc<RefreshCoordinator>,
}

impl ApiClient {
    /// Builds a client session from configuration and collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`AuthRelayError::Transport`] if the underlying HTTP
    /// client cannot be constructed.
    pub fn new(
        config: Config,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api.timeout_seconds))
            .user_agent(config.api.user_agent.clone())
            .build()
            .map_err(AuthRelayError::Transport)?;

        Ok(Self {
            http,
            config: Arc::new(config),
            store,
            navigator,
            coordinator: Arc::new(RefreshCoordinator::new()),
        })
    }

    /// Inserts the `Authorization: Bearer <token>` header into a header
    /// map.
    ///
    /// Uses insert semantics: applying it twice leaves a single header
    /// carrying the latest value.
    ///
    /// # Examples
    ///
    /// ```
    /// use authrelay::client::ApiClient;
    /// use reqwest::header::{HeaderMap, AUTHORIZATION};
    ///
    /// let mut headers = HeaderMap::new();
    /// ApiClient::attach_bearer(&mut headers, "my_access_token");
    /// ApiClient::attach_bearer(&mut headers, "my_access_token");
    ///
    /// assert_eq!(headers.get_all(AUTHORIZATION).iter().count(), 1);
    /// assert_eq!(
    ///     headers.get(AUTHORIZATION).unwrap().to_str().unwrap(),
    ///     "Bearer my_access_token"
    /// );
    /// ```
    pub fn attach_bearer(headers: &mut HeaderMap, access_token: &str) {
        match HeaderValue::from_str(&format!("Bearer {}", access_token)) {
            Ok(value) => {
                headers.insert(header::AUTHORIZATION, value);
            }
            Err(_) => {
                tracing::warn!("access token is not a valid header value, sending unauthenticated")
            }
        }
    }

    // -----------------------------------------------------------------------
    // Public request surface
    // -----------------------------------------------------------------------

    /// Performs a request and deserializes the JSON response body.
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let response = self.send(request).await?;
        let text = response.text().await.map_err(AuthRelayError::Transport)?;
        let value = serde_json::from_str(&text).map_err(AuthRelayError::Serialization)?;
        Ok(value)
    }

    /// Performs a request and returns the raw (already vetted) response.
    ///
    /// The returned response always has a success status; auth failures
    /// have been resolved or surfaced as errors by the time it is handed
    /// back.
    pub async fn send(&self, request: ApiRequest) -> Result<reqwest::Response> {
        let request_id = Uuid::new_v4();
        self.dispatch(&request, request_id).await
    }

    /// GET convenience wrapper around [`execute`](ApiClient::execute).
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute(ApiRequest::new(Method::GET, path)).await
    }

    /// POST convenience wrapper around [`execute`](ApiClient::execute).
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        self.execute(ApiRequest::new(Method::POST, path).with_body(body))
            .await
    }

    /// PUT convenience wrapper around [`execute`](ApiClient::execute).
    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        self.execute(ApiRequest::new(Method::PUT, path).with_body(body))
            .await
    }

    /// DELETE convenience wrapper around [`execute`](ApiClient::execute).
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute(ApiRequest::new(Method::DELETE, path)).await
    }

    // -----------------------------------------------------------------------
    // Pipeline
    // -----------------------------------------------------------------------

    /// Runs the full pipeline for one logical request: attach, send,
    /// detect, refresh-and-resubmit at most once.
    async fn dispatch(&self, request: &ApiRequest, request_id: Uuid) -> Result<reqwest::Response> {
        let token = self.store.access_token()?;
        let response = self
            .send_once(request, request_id, token.as_deref(), Attempt::Initial)
            .await?;

        let response = match self.detect(&request.path, response, Attempt::Initial)? {
            Verdict::Deliver(response) => response,
            Verdict::RefreshAndRetry => {
                tracing::debug!(
                    path = %request.path,
                    %request_id,
                    "unauthorized response, entering refresh protocol"
                );
                let access = self.coordinated_refresh().await?;
                let retried = self
                    .send_once(request, request_id, Some(&access), Attempt::Retried)
                    .await?;
                match self.detect(&request.path, retried, Attempt::Retried)? {
                    Verdict::Deliver(response) => response,
                    // The detector never asks to refresh a retried request.
                    Verdict::RefreshAndRetry => {
                        return Err(AuthRelayError::RefreshExhausted(
                            "request unauthorized after token refresh".to_string(),
                        )
                        .into())
                    }
                }
            }
        };

        self.check_status(response).await
    }

    /// Builds and sends one HTTP attempt. Transport failures surface as
    /// [`AuthRelayError::Transport`] and are never classified as auth
    /// failures.
    async fn send_once(
        &self,
        request: &ApiRequest,
        request_id: Uuid,
        token: Option<&str>,
        attempt: Attempt,
    ) -> Result<reqwest::Response> {
        let url = self.config.api.endpoint(&request.path);

        let mut headers = HeaderMap::new();
        if let Some(access_token) = token {
            Self::attach_bearer(&mut headers, access_token);
        }
        if let Ok(id_value) = HeaderValue::from_str(&request_id.to_string()) {
            headers.insert("X-Request-ID", id_value);
        }

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            %request_id,
            ?attempt,
            authenticated = token.is_some(),
            "dispatching request"
        );

        let mut builder = self.http.request(request.method.clone(), &url).headers(headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(AuthRelayError::Transport)?;
        Ok(response)
    }

    /// Failure detector: decides what to do with a response.
    ///
    /// Anything other than a 401 is delivered unchanged. A 401 triggers
    /// the refresh protocol exactly once per request; a 401 from the
    /// refresh endpoint itself or on an already-retried request is fatal
    /// and ends the session here.
    fn detect(
        &self,
        path: &str,
        response: reqwest::Response,
        attempt: Attempt,
    ) -> Result<Verdict> {
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(Verdict::Deliver(response));
        }

        if self.is_refresh_endpoint(path) {
            tracing::warn!(path, "refresh endpoint rejected its own request");
            return Err(self
                .expire_session(RefreshFailure::Rejected(
                    "refresh endpoint rejected the request".to_string(),
                ))
                .into());
        }

        match attempt {
            Attempt::Initial => Ok(Verdict::RefreshAndRetry),
            Attempt::Retried => {
                tracing::warn!(path, "request unauthorized after token refresh");
                Err(self
                    .expire_session(RefreshFailure::Rejected(
                        "request unauthorized after token refresh".to_string(),
                    ))
                    .into())
            }
        }
    }

    /// Maps non-success statuses on delivered responses to errors.
    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| status.to_string());

        if status == StatusCode::UNAUTHORIZED {
            // Reached only from bypass-path calls where refresh does not
            // apply, e.g. a login attempt with bad credentials.
            return Err(AuthRelayError::Unauthorized(message).into());
        }

        Err(AuthRelayError::Api {
            status: status.as_u16(),
            message,
        }
        .into())
    }

    fn is_refresh_endpoint(&self, path: &str) -> bool {
        path == self.config.auth.refresh_path
    }

    // -----------------------------------------------------------------------
    // Refresh protocol
    // -----------------------------------------------------------------------

    /// Obtains a fresh access token through the coordinator.
    ///
    /// Exactly one caller per episode performs the network exchange; the
    /// rest suspend until the outcome is delivered. On failure the leader
    /// clears the store and fires the navigator; followers only propagate
    /// the shared error.
    async fn coordinated_refresh(&self) -> Result<String> {
        match self.coordinator.begin_or_wait() {
            RefreshRole::Follower(rx) => match rx.await {
                Ok(Ok(access)) => Ok(access),
                Ok(Err(failure)) => Err(failure.into_error().into()),
                Err(_) => Err(AuthRelayError::RefreshExhausted(
                    "refresh episode ended without an outcome".to_string(),
                )
                .into()),
            },
            RefreshRole::Leader(permit) => {
                tracing::info!("starting credential refresh");
                match self.run_refresh().await {
                    Ok(pair) => {
                        let access = pair.access;
                        permit.complete(Ok(access.clone()));
                        Ok(access)
                    }
                    Err(failure) => {
                        permit.complete(Err(failure.clone()));
                        Err(self.expire_session(failure).into())
                    }
                }
            }
        }
    }

    /// Performs the refresh exchange on the bypass path and persists the
    /// new pair before returning it.
    ///
    /// Never re-enters the failure detector: any non-success outcome here
    /// is terminal for the episode.
    async fn run_refresh(&self) -> std::result::Result<TokenPair, RefreshFailure> {
        let refresh_token = match self.store.refresh_token() {
            Ok(Some(token)) => token,
            Ok(None) => {
                tracing::warn!("no refresh token stored, session cannot be renewed");
                return Err(RefreshFailure::MissingToken);
            }
            Err(e) => {
                return Err(RefreshFailure::Rejected(format!(
                    "credential store read failed: {:#}",
                    e
                )))
            }
        };

        let url = self.config.api.endpoint(&self.config.auth.refresh_path);
        let body = RefreshRequest { refresh_token };

        let response = match self.http.post(&url).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                return Err(RefreshFailure::Rejected(format!(
                    "refresh request failed: {}",
                    e
                )))
            }
        };

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            return Err(RefreshFailure::Rejected(format!(
                "refresh endpoint returned {}: {}",
                status, message
            )));
        }

        let refreshed: RefreshResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                return Err(RefreshFailure::Rejected(format!(
                    "invalid refresh response: {}",
                    e
                )))
            }
        };

        if let Err(e) = self
            .store
            .set_tokens(&refreshed.access_token, &refreshed.refresh_token)
        {
            return Err(RefreshFailure::Rejected(format!(
                "failed to persist refreshed credentials: {:#}",
                e
            )));
        }

        tracing::info!("credential refresh succeeded");
        Ok(TokenPair::new(refreshed.access_token, refreshed.refresh_token))
    }

    /// Ends the session after a fatal auth failure: clears the stored
    /// pair, redirects to login, and returns the error to propagate.
    fn expire_session(&self, failure: RefreshFailure) -> AuthRelayError {
        if let Err(e) = self.store.clear() {
            tracing::warn!("failed to clear credential store: {:#}", e);
        }
        self.navigator.redirect_to_login();
        failure.into_error()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
