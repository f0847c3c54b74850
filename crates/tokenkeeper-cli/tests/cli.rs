//! CLI tests against a mock API.
//!
//! These tests use wiremock to simulate an API issuing JWTs and run the
//! `tokenkeeper` binary with an isolated state directory.

mod common;

use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{jwt_expiring_in, run_cli_failure, run_cli_success};

async fn mount_login(server: &MockServer, token: &str, refresh_token: &str) {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({"username": "alice", "password": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": token,
            "refresh_token": refresh_token
        })))
        .mount(server)
        .await;
}

const LOGIN: &[&str] = &["login", "--username", "alice", "--password", "secret"];

#[tokio::test(flavor = "multi_thread")]
async fn test_login_and_status() {
    let server = MockServer::start().await;
    let state = TempDir::new().unwrap();
    mount_login(
        &server,
        &jwt_expiring_in("alice", 3600),
        &jwt_expiring_in("alice", 86400),
    )
    .await;

    let stdout = run_cli_success(LOGIN, state.path(), &server.uri()).await;
    assert!(stdout.contains("Logged in successfully"));
    assert!(state.path().join("session.json").exists());

    let stdout = run_cli_success(&["status", "--json"], state.path(), &server.uri()).await;
    let status: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(status["authenticated"], true);
    assert_eq!(status["subject"], "alice");
    assert_eq!(status["token_expired"], false);
    assert_eq!(status["credentials_expired"], false);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_request_sends_bearer_token() {
    let server = MockServer::start().await;
    let state = TempDir::new().unwrap();
    let token = jwt_expiring_in("alice", 3600);
    mount_login(&server, &token, &jwt_expiring_in("alice", 86400)).await;

    Mock::given(method("GET"))
        .and(path("/posts"))
        .and(query_param("limit", "2"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}, {"id": 2}])))
        .expect(1)
        .mount(&server)
        .await;

    run_cli_success(LOGIN, state.path(), &server.uri()).await;
    let stdout = run_cli_success(
        &["request", "/posts", "--query", "limit=2"],
        state.path(),
        &server.uri(),
    )
    .await;

    let posts: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(posts, json!([{"id": 1}, {"id": 2}]));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_request_refreshes_expired_token() {
    let server = MockServer::start().await;
    let state = TempDir::new().unwrap();
    let refresh_token = jwt_expiring_in("alice", 86400);
    let fresh = jwt_expiring_in("alice", 3600);
    mount_login(&server, &jwt_expiring_in("alice", -60), &refresh_token).await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({"refresh_token": refresh_token})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": fresh,
            "refresh_token": refresh_token
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/notes"))
        .and(header("authorization", format!("Bearer {}", fresh).as_str()))
        .and(body_json(json!({"text": "hi"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 7})))
        .expect(1)
        .mount(&server)
        .await;

    run_cli_success(LOGIN, state.path(), &server.uri()).await;
    let stdout = run_cli_success(
        &["request", "/notes", "-X", "post", "--data", r#"{"text":"hi"}"#],
        state.path(),
        &server.uri(),
    )
    .await;
    assert!(stdout.contains("\"id\": 7"));

    // The refreshed token was persisted.
    let stdout = run_cli_success(&["status", "--json"], state.path(), &server.uri()).await;
    let status: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(status["token_expired"], false);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_expired_session_fails_and_is_cleared() {
    let server = MockServer::start().await;
    let state = TempDir::new().unwrap();
    mount_login(
        &server,
        &jwt_expiring_in("alice", -60),
        &jwt_expiring_in("alice", -30),
    )
    .await;

    Mock::given(path("/posts"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    run_cli_success(LOGIN, state.path(), &server.uri()).await;
    let stderr = run_cli_failure(&["request", "/posts"], state.path(), &server.uri()).await;

    assert!(stderr.contains("Unable to refresh credentials"));
    assert!(stderr.contains("Session expired"));
    assert!(!state.path().join("session.json").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_refresh_and_logout() {
    let server = MockServer::start().await;
    let state = TempDir::new().unwrap();
    let refresh_token = jwt_expiring_in("alice", 86400);
    mount_login(&server, &jwt_expiring_in("alice", 3600), &refresh_token).await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": jwt_expiring_in("alice", 7200)
        })))
        .expect(1)
        .mount(&server)
        .await;

    run_cli_success(LOGIN, state.path(), &server.uri()).await;
    let stdout = run_cli_success(&["refresh"], state.path(), &server.uri()).await;
    assert!(stdout.contains("Session refreshed successfully"));

    let stdout = run_cli_success(&["logout"], state.path(), &server.uri()).await;
    assert!(stdout.contains("Logged out"));
    assert!(!state.path().join("session.json").exists());

    let stdout = run_cli_success(&["status"], state.path(), &server.uri()).await;
    assert!(stdout.contains("logged out"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_commands_without_session() {
    let server = MockServer::start().await;
    let state = TempDir::new().unwrap();

    let stderr = run_cli_failure(&["refresh"], state.path(), &server.uri()).await;
    assert!(stderr.contains("No active session"));

    let stdout = run_cli_success(&["logout"], state.path(), &server.uri()).await;
    assert!(stdout.contains("Already logged out"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_login() {
    let server = MockServer::start().await;
    let state = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_credentials",
            "message": "Bad password"
        })))
        .mount(&server)
        .await;

    let stderr = run_cli_failure(LOGIN, state.path(), &server.uri()).await;

    assert!(stderr.contains("Failed to login"));
    assert!(stderr.contains("Bad password"));
    assert!(!state.path().join("session.json").exists());
}

#[tokio::test]
async fn test_version_reports_package_version() {
    let state = TempDir::new().unwrap();

    let stdout = run_cli_success(&["--version"], state.path(), "http://127.0.0.1:9").await;

    assert_eq!(
        stdout.trim(),
        format!("tokenkeeper {}", env!("CARGO_PKG_VERSION"))
    );
}
