//! Error types for tokenkeeper.
//!
//! This module provides a unified error type with explicit variants for
//! transport, authentication, protocol, decoding, storage and input
//! validation errors.
//!
//! Every variant is `Clone` so that an error can be carried by an
//! [`ExpiredEvent`](crate::events::ExpiredEvent) and still be returned to
//! the caller that triggered it.

use std::fmt;
use thiserror::Error;

/// The unified error type for tokenkeeper operations.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Network transport errors (DNS, TLS, connection, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Credentials cannot be used or renewed.
    #[error("{0}")]
    Auth(#[from] AuthError),

    /// Non-success HTTP responses.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A token could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The credential store failed to read or write.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Invalid input (URL, header, empty token, configuration).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    /// A response could not be turned into an authentication state.
    #[error("unable to map response to credentials: {message}")]
    Mapping { message: String },

    /// An event listener failed.
    #[error("listener for '{event}' failed: {message}")]
    Listener { event: String, message: String },
}

impl Error {
    /// Create a mapping error.
    pub fn mapping(message: impl Into<String>) -> Self {
        Error::Mapping {
            message: message.into(),
        }
    }

    /// Create a listener error.
    pub fn listener(event: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Listener {
            event: event.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if the error was synthesized because the credentials
    /// could not be refreshed.
    pub fn is_unable_to_refresh(&self) -> bool {
        matches!(self, Error::Auth(AuthError::UnableToRefresh))
    }

    /// Returns the HTTP status if this is a protocol error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Protocol(err) => Some(err.status),
            _ => None,
        }
    }
}

/// Transport-level errors.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// The response body could not be read or parsed.
    #[error("invalid response body: {message}")]
    Body { message: String },

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

/// Authentication-related errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The access token is expired and there is no way to obtain a new one.
    #[error("Unable to refresh credentials")]
    UnableToRefresh,

    /// An operation needed a refresh token but the state has none.
    #[error("no refresh token available")]
    MissingRefreshToken,
}

/// Error returned by the server for a non-success status code.
#[derive(Debug, Clone)]
pub struct ProtocolError {
    /// HTTP status code.
    pub status: u16,
    /// Error code from the response body (if present).
    pub error: Option<String>,
    /// Error message from the response body (if present).
    pub message: Option<String>,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref error) = self.error {
            write!(f, " [{}]", error)?;
        }
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProtocolError {}

impl ProtocolError {
    /// Create a new protocol error.
    pub fn new(status: u16, error: Option<String>, message: Option<String>) -> Self {
        Self {
            status,
            error,
            message,
        }
    }

    /// Check if the server rejected the request's credentials.
    pub fn is_auth_error(&self) -> bool {
        self.status == 401 || self.status == 403
    }
}

/// Token decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The token does not have the requested segment.
    #[error("token is missing part #{part}")]
    MissingPart { part: usize },

    /// The segment is not valid base64url.
    #[error("invalid base64 in part #{part}: {reason}")]
    Base64 { part: usize, reason: String },

    /// The decoded segment is not a JSON object with valid claims.
    #[error("invalid JSON in part #{part}: {reason}")]
    Json { part: usize, reason: String },

    /// Any other structural problem reported by the JWT parser.
    #[error("malformed token: {reason}")]
    Malformed { reason: String },
}

/// Credential store errors.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Filesystem access failed.
    #[error("IO error on {path}: {message}")]
    Io { path: String, message: String },

    /// Stored data could not be (de)serialized.
    #[error("serialization failed: {message}")]
    Serialization { message: String },

    /// No backend is registered for the requested type.
    #[error("unknown storage type '{kind}'")]
    UnknownBackend { kind: String },

    /// The backend options are invalid.
    #[error("invalid options for '{kind}' storage: {reason}")]
    InvalidOptions { kind: String, reason: String },
}

/// Input validation errors.
#[derive(Debug, Clone, Error)]
pub enum InvalidInputError {
    /// Invalid URL.
    #[error("invalid URL '{value}': {reason}")]
    Url { value: String, reason: String },

    /// The request has no URL and no base URL is configured.
    #[error("request has no URL")]
    MissingUrl,

    /// Invalid header name or value.
    #[error("invalid header '{name}': {reason}")]
    Header { name: String, reason: String },

    /// Authentication state without an access token.
    #[error("authentication state requires a non-empty token")]
    EmptyToken,

    /// Generic invalid input.
    #[error("{message}")]
    Other { message: String },
}
