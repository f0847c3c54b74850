//! Transport trait.

use async_trait::async_trait;

use crate::Result;
use crate::request::{RequestConfig, Response};

/// Executes requests over the network.
///
/// Implementations return [`Error::Protocol`](crate::Error::Protocol) for
/// non-success statuses and [`Error::Transport`](crate::Error::Transport)
/// when no response was received. They never retry.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and wait for its response.
    async fn send(&self, request: RequestConfig) -> Result<Response>;
}
