//! Request pipeline.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::Result;
use crate::dispatcher::{Dispatcher, Listener, Subscription};
use crate::error::InvalidInputError;
use crate::events::{Event, RequestEvent};
use crate::request::{RequestConfig, Response};
use crate::traits::Transport;

/// A request pipeline in front of a [`Transport`].
///
/// Every request is first dispatched as a [`RequestEvent`] named
/// [`REQUEST`](crate::events::REQUEST). Listeners run in priority order and
/// may modify the request. If any of them fails, the request is abandoned
/// and never reaches the transport.
///
/// Clients are cheap to clone; clones share listeners and transport.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    dispatcher: Dispatcher,
}

impl Client {
    /// Create a client sending requests through `transport`.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::with_transport(Arc::new(transport))
    }

    /// Create a client from a shared transport.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                dispatcher: Dispatcher::new(),
            }),
        }
    }

    /// Returns the event dispatcher of this pipeline.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    /// Register a listener on this pipeline's dispatcher.
    pub fn on(
        &self,
        event: impl Into<String>,
        priority: i32,
        listener: Arc<dyn Listener>,
    ) -> Subscription {
        self.inner.dispatcher.on(event, priority, listener)
    }

    /// Dispatch an event on this pipeline's dispatcher.
    pub async fn dispatch(&self, event: &mut Event, propagate_errors: bool) -> Result<()> {
        self.inner.dispatcher.dispatch(event, propagate_errors).await
    }

    /// Run a request through the pipeline and send it.
    #[instrument(skip(self, config), fields(method = %config.method_or_default(), url = ?config.url))]
    pub async fn request(&self, config: RequestConfig) -> Result<Response> {
        let mut event = Event::from(RequestEvent::new(config));
        self.inner.dispatcher.dispatch(&mut event, true).await?;

        let Event::Request(request) = event else {
            return Err(InvalidInputError::Other {
                message: "request event was replaced by a listener".to_string(),
            }
            .into());
        };

        debug!(action = ?request.context().action, "Sending request");
        self.inner.transport.send(request.config).await
    }

    /// Send a GET request.
    pub async fn get(&self, url: impl Into<String>) -> Result<Response> {
        self.request(RequestConfig::get(url)).await
    }

    /// Send a POST request with a JSON body.
    pub async fn post(&self, url: impl Into<String>, data: Value) -> Result<Response> {
        self.request(RequestConfig::post(url).with_data(data)).await
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("dispatcher", &self.inner.dispatcher)
            .finish_non_exhaustive()
    }
}
