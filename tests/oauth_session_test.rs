//! Session correlation and callback endpoint integration tests
//!
//! Verifies `src/auth/session.rs` and `src/auth/callback.rs` end to end:
//!
//! - A state value is accepted at most once, even after a successful
//!   exchange.
//! - The callback HTTP endpoint completes the flow and unblocks
//!   `wait_for_authorization`.
//! - Denials and unknown sessions render human-readable failures.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mcp_authkit::auth::callback::CallbackServer;
use mcp_authkit::auth::client::OAuthClient;
use mcp_authkit::auth::session::{CallbackParams, SessionCorrelator};
use mcp_authkit::config::OAuthConfig;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn mount_authorization_server(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-authorization-server"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "issuer": server.uri(),
            "authorization_endpoint": format!("{}/authorize", server.uri()),
            "token_endpoint": format!("{}/token", server.uri()),
            "response_types_supported": ["code"],
            "code_challenge_methods_supported": ["S256"],
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "session_test_access",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .mount(server)
        .await;
}

fn make_client(server_uri: &str) -> Arc<OAuthClient> {
    let config = OAuthConfig {
        authorization_server: server_uri.parse().expect("server URI parses"),
        client_id: Some("agentic_ai".to_string()),
        client_secret: None,
        redirect_uri: "http://localhost:3001/callback".parse().unwrap(),
        scope: "read write".to_string(),
        resource: "http://localhost:3000".parse().unwrap(),
        client_name: "mcp-authkit".to_string(),
        client_uri: None,
    };
    Arc::new(OAuthClient::new(config).expect("client builds"))
}

// ---------------------------------------------------------------------------
// Single-use sessions
// ---------------------------------------------------------------------------

/// After a successful exchange for state S, a second callback with S
/// must fail with unknown-session.
#[tokio::test]
async fn test_session_is_single_use_after_success() {
    let server = MockServer::start().await;
    mount_authorization_server(&server).await;

    let client = make_client(&server.uri());
    let correlator = SessionCorrelator::new();

    let started = correlator
        .begin_authorization(Arc::clone(&client))
        .await
        .expect("flow starts");

    correlator
        .handle_callback(CallbackParams::success("abc123", started.state.clone()))
        .await
        .expect("first callback succeeds");

    let err = correlator
        .handle_callback(CallbackParams::success("abc123", started.state))
        .await
        .unwrap_err();
    assert!(
        err.to_string().contains("Unknown or expired"),
        "replayed state must hit unknown-session: {err}"
    );
}

/// Two flows for two clients coexist; each state resolves to its own
/// client.
#[tokio::test]
async fn test_concurrent_flows_resolve_to_their_own_clients() {
    let server = MockServer::start().await;
    mount_authorization_server(&server).await;

    let client_a = make_client(&server.uri());
    let client_b = make_client(&server.uri());
    let correlator = SessionCorrelator::new();

    let started_a = correlator
        .begin_authorization(Arc::clone(&client_a))
        .await
        .expect("flow A starts");
    let started_b = correlator
        .begin_authorization(Arc::clone(&client_b))
        .await
        .expect("flow B starts");
    assert_ne!(started_a.state, started_b.state);

    correlator
        .handle_callback(CallbackParams::success("code_b", started_b.state))
        .await
        .expect("flow B completes");

    assert!(
        client_b.has_valid_token().await,
        "client B must hold the exchanged token"
    );
    assert!(
        !client_a.has_valid_token().await,
        "client A's flow is still pending"
    );

    correlator
        .handle_callback(CallbackParams::success("code_a", started_a.state))
        .await
        .expect("flow A completes");
    assert!(client_a.has_valid_token().await);
}

// ---------------------------------------------------------------------------
// Callback HTTP endpoint
// ---------------------------------------------------------------------------

/// Browser-side view of a successful flow: GET /callback completes the
/// exchange, renders a success page, and unblocks the waiting task.
#[tokio::test]
async fn test_callback_endpoint_completes_interactive_flow() {
    let server = MockServer::start().await;
    mount_authorization_server(&server).await;

    let client = make_client(&server.uri());
    let correlator = Arc::new(SessionCorrelator::new());
    let callback_server = CallbackServer::bind("127.0.0.1:0".parse().unwrap(), Arc::clone(&correlator))
        .await
        .expect("callback server binds");

    let started = correlator
        .begin_authorization(Arc::clone(&client))
        .await
        .expect("flow starts");

    let callback_url = format!(
        "http://{}/callback?code=abc123&state={}",
        callback_server.local_addr(),
        started.state
    );
    let page = reqwest::get(&callback_url).await.expect("callback GET");
    assert_eq!(page.status(), reqwest::StatusCode::OK);
    let body = page.text().await.expect("page body");
    assert!(body.contains("successful"), "got page: {body}");

    let response = callback_server
        .wait_for_authorization(Duration::from_secs(5))
        .await
        .expect("waiter unblocks with the outcome");
    assert_eq!(response.access_token, "session_test_access");
    assert!(client.has_valid_token().await);
}

/// A denial redirect renders a human-readable failure and surfaces the
/// denial to the waiting task without touching any session.
#[tokio::test]
async fn test_callback_endpoint_reports_denial() {
    let correlator = Arc::new(SessionCorrelator::new());
    let callback_server = CallbackServer::bind("127.0.0.1:0".parse().unwrap(), Arc::clone(&correlator))
        .await
        .expect("callback server binds");

    let callback_url = format!(
        "http://{}/callback?error=access_denied&error_description=user+declined",
        callback_server.local_addr()
    );
    let page = reqwest::get(&callback_url).await.expect("callback GET");
    assert_eq!(page.status(), reqwest::StatusCode::BAD_REQUEST);
    let body = page.text().await.expect("page body");
    assert!(body.contains("access_denied"), "got page: {body}");
    assert!(body.contains("user declined"), "got page: {body}");

    let err = callback_server
        .wait_for_authorization(Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("access_denied"));
}

/// A callback with a state nobody issued renders the unknown-session
/// failure.
#[tokio::test]
async fn test_callback_endpoint_rejects_unknown_state() {
    let correlator = Arc::new(SessionCorrelator::new());
    let callback_server = CallbackServer::bind("127.0.0.1:0".parse().unwrap(), Arc::clone(&correlator))
        .await
        .expect("callback server binds");

    let callback_url = format!(
        "http://{}/callback?code=abc123&state=nobody_issued_this",
        callback_server.local_addr()
    );
    let page = reqwest::get(&callback_url).await.expect("callback GET");
    assert_eq!(page.status(), reqwest::StatusCode::BAD_REQUEST);
    let body = page.text().await.expect("page body");
    assert!(body.contains("Unknown or expired"), "got page: {body}");
}

/// A callback missing its parameters renders the malformed-callback
/// failure.
#[tokio::test]
async fn test_callback_endpoint_rejects_missing_parameters() {
    let correlator = Arc::new(SessionCorrelator::new());
    let callback_server = CallbackServer::bind("127.0.0.1:0".parse().unwrap(), Arc::clone(&correlator))
        .await
        .expect("callback server binds");

    let callback_url = format!("http://{}/callback", callback_server.local_addr());
    let page = reqwest::get(&callback_url).await.expect("callback GET");
    assert_eq!(page.status(), reqwest::StatusCode::BAD_REQUEST);
    let body = page.text().await.expect("page body");
    assert!(body.contains("Malformed"), "got page: {body}");
}
