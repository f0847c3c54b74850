//! Request and response types exchanged with a [`Transport`](crate::Transport).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, InvalidInputError};

/// Name of the authorization header.
pub const AUTHORIZATION: &str = "Authorization";

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl Method {
    /// Returns the method name in upper case.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            _ => Err(InvalidInputError::Other {
                message: format!("unknown HTTP method '{}'", s),
            }
            .into()),
        }
    }
}

/// Per-request metadata that travels with a request through the pipeline.
///
/// The context is never sent over the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    /// Tag naming the operation that issued the request (`jwt:login`, ...).
    pub action: Option<String>,
    /// `Some(false)` disables credential injection for this request.
    pub authenticate: Option<bool>,
    /// Set once credentials have been attached to the request.
    pub is_authenticated: bool,
    /// Free-form values for other pipeline listeners.
    pub extra: Map<String, Value>,
}

impl RequestContext {
    /// Context for an internal request that must not be authenticated.
    pub fn unauthenticated(action: impl Into<String>) -> Self {
        Self {
            action: Some(action.into()),
            authenticate: Some(false),
            ..Self::default()
        }
    }

    /// Returns `true` if the request explicitly opted out of authentication.
    pub fn authentication_disabled(&self) -> bool {
        self.authenticate == Some(false)
    }
}

/// An outgoing request, before it is handed to the transport.
#[derive(Clone, Default, PartialEq)]
pub struct RequestConfig {
    /// Absolute URL, or a path resolved against the transport's base URL.
    pub url: Option<String>,
    /// Request method. The transport treats `None` as GET.
    pub method: Option<Method>,
    pub headers: BTreeMap<String, String>,
    /// Query parameters, serialized from a JSON object.
    pub params: Option<Value>,
    /// JSON request body.
    pub data: Option<Value>,
    pub context: RequestContext,
}

impl RequestConfig {
    /// Create a request for the given method and URL.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            method: Some(method),
            ..Self::default()
        }
    }

    /// Create a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// Create a POST request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    /// Set a header, replacing any existing header with the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Set the query parameters.
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    /// Set the JSON body.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Set the request context.
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    /// Returns the effective method.
    pub fn method_or_default(&self) -> Method {
        self.method.unwrap_or(Method::Get)
    }

    /// Set a header. Header names are compared case-insensitively.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
    }

    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Attach a bearer token as the `Authorization` header.
    pub fn set_bearer(&mut self, token: &str) {
        self.set_header(AUTHORIZATION, format!("Bearer {}", token));
    }
}

// Authorization values, query parameters and bodies may carry credentials
// and must not end up in logs.
impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: BTreeMap<&str, &str> = self
            .headers
            .iter()
            .map(|(k, v)| {
                if k.eq_ignore_ascii_case(AUTHORIZATION) {
                    (k.as_str(), "[REDACTED]")
                } else {
                    (k.as_str(), v.as_str())
                }
            })
            .collect();

        f.debug_struct("RequestConfig")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("headers", &headers)
            .field("params", &self.params.as_ref().map(|_| "[PARAMS]"))
            .field("data", &self.data.as_ref().map(|_| "[BODY]"))
            .field("context", &self.context)
            .finish()
    }
}

/// A response returned by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    /// Parsed JSON body, `Value::Null` when empty.
    pub data: Value,
}

impl Response {
    /// Create a response with the given status and body.
    pub fn new(status: u16, data: Value) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            data,
        }
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
