//! Shared helpers for credential manager tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use jsonwebtoken::{EncodingKey, Header};
use serde_json::{Value, json};

use tokenkeeper_core::error::ProtocolError;
use tokenkeeper_core::events;
use tokenkeeper_core::state::unix_timestamp;
use tokenkeeper_core::{Client, Error, Event, RequestConfig, Response, Result, Transport, listener_fn};

/// Build an HS256 JWT with the given payload.
pub fn jwt(payload: Value) -> String {
    jsonwebtoken::encode(
        &Header::default(),
        &payload,
        &EncodingKey::from_secret(b"test-issuer"),
    )
    .unwrap()
}

/// A JWT expiring `offset` seconds from now.
pub fn jwt_expiring_in(subject: &str, offset: i64) -> String {
    jwt(json!({"sub": subject, "exp": unix_timestamp() + offset}))
}

type Handler = Box<dyn Fn(&RequestConfig) -> Result<Response> + Send + Sync>;

/// Transport answering from a routing closure and recording every request.
pub struct MockTransport {
    handler: Handler,
    requests: Mutex<Vec<RequestConfig>>,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&RequestConfig) -> Result<Response> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn client(self: &Arc<Self>) -> Client {
        Client::with_transport(self.clone())
    }

    pub fn requests(&self) -> Vec<RequestConfig> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, url: &str) -> Vec<RequestConfig> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.as_deref() == Some(url))
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: RequestConfig) -> Result<Response> {
        self.requests.lock().unwrap().push(request.clone());
        (self.handler)(&request)
    }
}

/// A standard auth server: `/auth` and `/refresh` issue fresh tokens,
/// anything else echoes the Authorization header.
pub fn auth_server() -> Arc<MockTransport> {
    let issued = AtomicUsize::new(0);
    MockTransport::new(move |request| match request.url.as_deref() {
        Some("/auth") | Some("/refresh") => {
            let n = issued.fetch_add(1, Ordering::SeqCst);
            Ok(Response::new(
                200,
                json!({
                    "token": jwt_expiring_in(&format!("access-{}", n), 3600),
                    "refresh_token": jwt_expiring_in(&format!("refresh-{}", n), 86400),
                }),
            ))
        }
        _ => Ok(Response::new(
            200,
            json!({ "authorization": request.header("authorization") }),
        )),
    })
}

pub fn unauthorized() -> Error {
    Error::Protocol(ProtocolError::new(
        401,
        Some("invalid_grant".to_string()),
        None,
    ))
}

/// Counts the events named `event` dispatched on `client`.
pub fn count_events(client: &Client, event: &str) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    client.on(
        event,
        0,
        listener_fn(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }),
    );
    count
}

/// Collects the errors carried by expired events.
pub fn collect_expired(client: &Client) -> Arc<Mutex<Vec<Error>>> {
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    client.on(
        events::EXPIRED,
        0,
        listener_fn(move |event| {
            if let Event::Expired(expired) = event {
                sink.lock().unwrap().push(expired.error.clone());
            }
            Ok(())
        }),
    );
    errors
}

pub fn now() -> i64 {
    unix_timestamp()
}
