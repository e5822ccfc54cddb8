//! Session operation integration tests using wiremock
//!
//! Covers login, logout, status, and the request pipeline's ambient
//! headers: bearer attachment, request IDs, and JSON bodies.

mod common;

use std::sync::Arc;

use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use authrelay::auth::store::{MemoryTokenStore, TokenStore};
use authrelay::client::auth::LoginCredentials;
use authrelay::error::AuthRelayError;

use common::{test_client, RecordingNavigator};

fn login_response_body() -> serde_json::Value {
    serde_json::json!({
        "access_token": "session_access",
        "refresh_token": "session_refresh",
        "user": {
            "id": "u1",
            "username": "ada",
            "name": "Ada Lovelace",
            "role": "admin"
        }
    })
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

/// A successful login persists the returned pair and yields the user.
#[tokio::test]
async fn test_login_persists_tokens_and_returns_user() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(
            serde_json::json!({ "username": "ada", "password": "hunter2" }),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_response_body()))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let client = test_client(&server.uri(), Arc::clone(&store), navigator);

    let user = client
        .login(&LoginCredentials::new("ada", "hunter2"))
        .await
        .unwrap();

    assert_eq!(user.username, "ada");
    assert_eq!(user.role.as_deref(), Some("admin"));
    assert_eq!(
        store.access_token().unwrap().as_deref(),
        Some("session_access")
    );
    assert_eq!(
        store.refresh_token().unwrap().as_deref(),
        Some("session_refresh")
    );
    assert!(client.authenticated());

    server.verify().await;
}

/// Invalid credentials surface as `Unauthorized`: no refresh attempt, no
/// redirect, and the store stays empty.
#[tokio::test]
async fn test_login_with_bad_credentials_is_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid credentials"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let client = test_client(&server.uri(), Arc::clone(&store), Arc::clone(&navigator));

    let error = client
        .login(&LoginCredentials::new("ada", "wrong"))
        .await
        .unwrap_err();
    let typed = error
        .downcast_ref::<AuthRelayError>()
        .expect("typed error expected");
    match typed {
        AuthRelayError::Unauthorized(message) => assert_eq!(message, "invalid credentials"),
        other => panic!("unexpected error: {:?}", other),
    }

    assert!(store.access_token().unwrap().is_none());
    assert!(!client.authenticated());
    assert_eq!(navigator.redirect_count(), 0);

    server.verify().await;
}

// ---------------------------------------------------------------------------
// Logout
// ---------------------------------------------------------------------------

/// Logout is local-only: the store is cleared, the navigator fires, and
/// no request leaves the client.
#[tokio::test]
async fn test_logout_clears_session_without_network() {
    let server = MockServer::start().await;

    let store = Arc::new(MemoryTokenStore::with_tokens("access", "refresh"));
    let navigator = Arc::new(RecordingNavigator::new());
    let client = test_client(&server.uri(), Arc::clone(&store), Arc::clone(&navigator));

    client.logout().unwrap();

    assert!(store.access_token().unwrap().is_none());
    assert_eq!(navigator.redirect_count(), 1);
    assert!(server.received_requests().await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Pipeline headers
// ---------------------------------------------------------------------------

/// Authenticated requests carry the bearer header and a request ID.
#[tokio::test]
async fn test_requests_carry_bearer_and_request_id() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/members"))
        .and(header("Authorization", "Bearer access_abc"))
        .and(header_exists("X-Request-ID"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::with_tokens("access_abc", "refresh_xyz"));
    let navigator = Arc::new(RecordingNavigator::new());
    let client = test_client(&server.uri(), store, navigator);

    let _: Vec<serde_json::Value> = client.get("/members").await.unwrap();

    server.verify().await;
}

/// POST bodies are sent as JSON and typed responses deserialize.
#[tokio::test]
async fn test_post_sends_json_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/members"))
        .and(body_json(serde_json::json!({ "name": "ada" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "id": "m1", "name": "ada" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::with_tokens("access", "refresh"));
    let navigator = Arc::new(RecordingNavigator::new());
    let client = test_client(&server.uri(), store, navigator);

    let created: serde_json::Value = client
        .post("/members", serde_json::json!({ "name": "ada" }))
        .await
        .unwrap();
    assert_eq!(created["id"], "m1");

    server.verify().await;
}
