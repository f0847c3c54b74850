//! reqwest transport tests against a mock server.

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tokenkeeper_core::error::TransportError;
use tokenkeeper_core::{Error, Method, RequestConfig, Transport};
use tokenkeeper_http::ReqwestTransport;

async fn transport(server: &MockServer) -> ReqwestTransport {
    ReqwestTransport::with_base_url(server.uri()).unwrap()
}

#[tokio::test]
async fn test_sends_method_headers_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/items/1"))
        .and(header("x-trace", "abc"))
        .and(body_json(json!({"name": "widget"})))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("x-request-id", "r-1")
                .set_body_json(json!({"id": 1})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let request = RequestConfig::new(Method::Put, "/items/1")
        .with_header("X-Trace", "abc")
        .with_data(json!({"name": "widget"}));
    let response = transport(&server).await.send(request).await.unwrap();

    assert_eq!(response.status, 201);
    assert!(response.is_success());
    assert_eq!(response.data, json!({"id": 1}));
    assert_eq!(
        response.headers.get("x-request-id").map(String::as_str),
        Some("r-1")
    );
}

#[tokio::test]
async fn test_sends_query_parameters() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "rust"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let request = RequestConfig::get("/search").with_params(json!({"q": "rust", "page": 2}));
    let response = transport(&server).await.send(request).await.unwrap();

    assert_eq!(response.data, json!("ok"));
}

#[tokio::test]
async fn test_error_status_becomes_protocol_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/secret"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": "forbidden",
            "message": "Not allowed"
        })))
        .mount(&server)
        .await;

    let err = transport(&server)
        .await
        .send(RequestConfig::get("/secret"))
        .await
        .unwrap_err();

    match err {
        Error::Protocol(protocol) => {
            assert_eq!(protocol.status, 403);
            assert_eq!(protocol.error.as_deref(), Some("forbidden"));
            assert_eq!(protocol.message.as_deref(), Some("Not allowed"));
        }
        other => panic!("expected protocol error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_body_is_null() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/items/1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let response = transport(&server)
        .await
        .send(RequestConfig::new(Method::Delete, "/items/1"))
        .await
        .unwrap();

    assert_eq!(response.status, 204);
    assert!(response.data.is_null());
}

#[tokio::test]
async fn test_unreachable_server_is_a_transport_error() {
    let transport = ReqwestTransport::with_base_url("http://127.0.0.1:1").unwrap();

    let err = transport.send(RequestConfig::get("/")).await.unwrap_err();

    assert!(matches!(
        err,
        Error::Transport(TransportError::Connection { .. })
    ));
}
