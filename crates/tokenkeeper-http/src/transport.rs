//! reqwest transport implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use tracing::{debug, instrument, trace};
use url::Url;

use tokenkeeper_core::error::{InvalidInputError, ProtocolError, TransportError};
use tokenkeeper_core::{Error, Method, RequestConfig, Response, Result, Transport};

fn map_reqwest(err: reqwest::Error) -> Error {
    let err = if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connection {
            message: err.to_string(),
        }
    } else if err.is_body() || err.is_decode() {
        TransportError::Body {
            message: err.to_string(),
        }
    } else {
        TransportError::Http {
            message: err.to_string(),
        }
    };
    Error::Transport(err)
}

/// HTTP transport built on [`reqwest`].
///
/// Relative request URLs are resolved against an optional base URL.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Option<Url>,
}

impl ReqwestTransport {
    /// Create a transport without a base URL.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("tokenkeeper/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(map_reqwest)?;

        Ok(Self {
            client,
            base_url: None,
        })
    }

    /// Create a transport resolving relative URLs against `base_url`.
    pub fn with_base_url(base_url: impl AsRef<str>) -> Result<Self> {
        let base_url = base_url.as_ref();
        let url = Url::parse(base_url).map_err(|e| InvalidInputError::Url {
            value: base_url.to_string(),
            reason: e.to_string(),
        })?;

        let mut transport = Self::new()?;
        transport.base_url = Some(url);
        Ok(transport)
    }

    /// Use an existing reqwest client.
    pub fn from_client(client: reqwest::Client, base_url: Option<Url>) -> Self {
        Self { client, base_url }
    }

    /// Returns the base URL, if any.
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Resolve the URL a request will be sent to.
    pub fn resolve_url(&self, request: &RequestConfig) -> Result<Url> {
        let Some(url) = request.url.as_deref() else {
            return self
                .base_url
                .clone()
                .ok_or_else(|| InvalidInputError::MissingUrl.into());
        };

        match Url::parse(url) {
            Ok(absolute) => Ok(absolute),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self.base_url.as_ref().ok_or(InvalidInputError::MissingUrl)?;
                join(base, url)
            }
            Err(e) => Err(invalid_url(url, e)),
        }
    }

    fn headers(request: &RequestConfig) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| InvalidInputError::Header {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| InvalidInputError::Header {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            headers.insert(header_name, header_value);
        }
        Ok(headers)
    }

    /// Handle a response, parsing the body or error.
    async fn handle_response(&self, response: reqwest::Response) -> Result<Response> {
        let status = response.status();
        trace!(status = %status, "HTTP response");

        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();

        let bytes = response.bytes().await.map_err(map_reqwest)?;
        let data = parse_body(&bytes);

        if status.is_success() {
            Ok(Response {
                status: status.as_u16(),
                headers,
                data,
            })
        } else {
            Err(Error::Protocol(protocol_error(status.as_u16(), &data)))
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip(self, request), fields(method = %request.method_or_default()))]
    async fn send(&self, request: RequestConfig) -> Result<Response> {
        let url = self.resolve_url(&request)?;
        debug!(%url, "HTTP request");

        let mut builder = self
            .client
            .request(reqwest_method(request.method_or_default()), url)
            .headers(Self::headers(&request)?);

        if let Some(params) = &request.params {
            let pairs = query_pairs(params);
            builder = builder.query(&pairs);
        }

        if let Some(data) = &request.data {
            builder = builder.json(data);
        }

        let response = builder.send().await.map_err(map_reqwest)?;
        self.handle_response(response).await
    }
}

/// Join `path` onto `base`, treating the base path as a directory so that
/// its last segment is kept.
fn join(base: &Url, path: &str) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let dir = format!("{}/", base.path());
        base.set_path(&dir);
    }
    base.join(path.trim_start_matches('/'))
        .map_err(|e| invalid_url(path, e))
}

fn invalid_url(value: &str, err: url::ParseError) -> Error {
    InvalidInputError::Url {
        value: value.to_string(),
        reason: err.to_string(),
    }
    .into()
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Head => reqwest::Method::HEAD,
        Method::Options => reqwest::Method::OPTIONS,
    }
}

/// Flatten a JSON object into query pairs. Arrays repeat their key and
/// nulls are dropped.
fn query_pairs(params: &Value) -> Vec<(String, String)> {
    fn scalar(value: &Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    let Value::Object(map) = params else {
        return Vec::new();
    };

    let mut pairs = Vec::new();
    for (key, value) in map {
        match value {
            Value::Array(items) => {
                pairs.extend(items.iter().filter_map(scalar).map(|v| (key.clone(), v)));
            }
            other => {
                if let Some(v) = scalar(other) {
                    pairs.push((key.clone(), v));
                }
            }
        }
    }
    pairs
}

/// Parse a body as JSON, falling back to a string; empty bodies are null.
fn parse_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

fn protocol_error(status: u16, body: &Value) -> ProtocolError {
    let field = |name: &str| body.get(name).and_then(Value::as_str).map(str::to_string);
    ProtocolError::new(status, field("error"), field("message"))
}
