//! Login, registration, and logout against a mock server.

use std::sync::Arc;

use gameplan_core::{ApiClient, ApiError, Config, TokenStore, TokenUpdate};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

fn client_against(server: &MockServer) -> (ApiClient, Arc<TokenStore>, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let store = Arc::new(TokenStore::open(dir.path()).expect("open store"));
    let client = ApiClient::new(&Config::new(server.uri()), Arc::clone(&store)).expect("client");
    (client, store, dir)
}

/// Matches requests that carry no Authorization header at all.
struct NoAuthHeader;

impl Match for NoAuthHeader {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("authorization")
    }
}

#[tokio::test]
async fn test_login_round_trip() {
    let server = MockServer::start().await;
    let (client, store, _dir) = client_against(&server);

    Mock::given(method("POST"))
        .and(path("/auth/token/"))
        .and(body_json(json!({"username": "alice", "password": "hunter2"})))
        .and(NoAuthHeader)
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access": "A1", "refresh": "R1"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/auth/me/"))
        .and(header("Authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7, "username": "alice", "email": "alice@example.com"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/token/refresh/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    assert!(!client.is_authenticated());
    client.login("alice", "hunter2").await.expect("login");
    assert!(client.is_authenticated());

    let user = client.me().await.expect("me");
    assert_eq!(user.username, "alice");
    assert_eq!(store.access().as_deref(), Some("A1"));
    assert_eq!(store.refresh_token().as_deref(), Some("R1"));
}

#[tokio::test]
async fn test_rejected_login_reads_as_invalid_credentials() {
    let server = MockServer::start().await;
    let (client, store, _dir) = client_against(&server);

    Mock::given(method("POST"))
        .and(path("/auth/token/"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "wrong password"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    // A rejected login is a bad submission, never a stale session.
    Mock::given(method("POST"))
        .and(path("/auth/token/refresh/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = client.login("alice", "wrong").await;
    assert!(matches!(outcome, Err(ApiError::InvalidCredentials)));
    assert!(!client.is_authenticated());
    assert!(store.access().is_none());
}

#[tokio::test]
async fn test_register_success_does_not_log_in() {
    let server = MockServer::start().await;
    let (client, store, _dir) = client_against(&server);

    Mock::given(method("POST"))
        .and(path("/auth/register/"))
        .and(body_json(json!({
            "username": "bob",
            "email": "bob@example.com",
            "password": "hunter2"
        })))
        .and(NoAuthHeader)
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 8, "username": "bob", "email": "bob@example.com"
        })))
        .expect(1)
        .mount(&server)
        .await;

    client
        .register("bob", "bob@example.com", "hunter2")
        .await
        .expect("register");
    assert!(!client.is_authenticated());
    assert!(store.access().is_none());
}

#[tokio::test]
async fn test_rejected_registration_carries_the_server_detail() {
    let server = MockServer::start().await;
    let (client, _store, _dir) = client_against(&server);

    Mock::given(method("POST"))
        .and(path("/auth/register/"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"username": ["a user with that name already exists"]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    match client.register("bob", "bob@example.com", "hunter2").await {
        Err(ApiError::RegistrationFailed(detail)) => {
            assert!(detail.contains("already exists"));
        }
        other => panic!("expected RegistrationFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let server = MockServer::start().await;
    let (client, store, _dir) = client_against(&server);
    store
        .set_tokens(TokenUpdate::pair("A1", "R1"))
        .expect("seed tokens");

    client.logout();
    client.logout();
    assert!(!client.is_authenticated());

    // The next request goes out with no Authorization header at all.
    Mock::given(method("GET"))
        .and(path("/auth/me/"))
        .and(NoAuthHeader)
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/token/refresh/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = client.me().await;
    assert!(matches!(outcome, Err(ApiError::NotAuthorized)));
}

#[tokio::test]
async fn test_me_without_a_session_is_not_authorized() {
    let server = MockServer::start().await;
    let (client, _store, _dir) = client_against(&server);

    Mock::given(method("GET"))
        .and(path("/auth/me/"))
        .and(NoAuthHeader)
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/token/refresh/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = client.me().await;
    assert!(matches!(outcome, Err(ApiError::NotAuthorized)));
}
