//! Events flowing through the [`Dispatcher`](crate::Dispatcher).

use crate::claims::Claims;
use crate::error::Error;
use crate::request::{RequestConfig, RequestContext, Response};
use crate::state::AuthenticationState;

/// Name of the event dispatched before every outgoing request.
pub const REQUEST: &str = "request";
/// Name of the event dispatched after credentials were obtained.
pub const LOGIN: &str = "jwt:login";
/// Name of the event dispatched when credentials are discarded.
pub const LOGOUT: &str = "jwt:logout";
/// Name of the event dispatched when credentials cannot be renewed.
pub const EXPIRED: &str = "jwt:expired";

/// An outgoing request about to be sent. Listeners may modify it.
#[derive(Debug, Clone)]
pub struct RequestEvent {
    pub config: RequestConfig,
}

impl RequestEvent {
    pub fn new(config: RequestConfig) -> Self {
        Self { config }
    }

    pub fn context(&self) -> &RequestContext {
        &self.config.context
    }

    pub fn context_mut(&mut self) -> &mut RequestContext {
        &mut self.config.context
    }
}

/// Credentials were obtained by a login or a refresh.
#[derive(Debug, Clone)]
pub struct LoginEvent {
    /// The response the state was mapped from.
    pub response: Response,
    /// The new state.
    pub state: AuthenticationState,
    /// Decoded claims of the new access token.
    pub claims: Claims,
}

/// The credentials are being discarded.
#[derive(Debug, Clone, Default)]
pub struct LogoutEvent;

/// Credentials expired and could not be renewed.
#[derive(Debug, Clone)]
pub struct ExpiredEvent {
    /// The request that needed the credentials.
    pub request: RequestEvent,
    /// Why renewal was impossible.
    pub error: Error,
}

/// Every event known to the pipeline.
#[derive(Debug, Clone)]
pub enum Event {
    Request(RequestEvent),
    Login(LoginEvent),
    Logout(LogoutEvent),
    Expired(ExpiredEvent),
}

impl Event {
    /// Returns the name listeners subscribe to.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Request(_) => REQUEST,
            Event::Login(_) => LOGIN,
            Event::Logout(_) => LOGOUT,
            Event::Expired(_) => EXPIRED,
        }
    }

    pub fn as_request(&self) -> Option<&RequestEvent> {
        match self {
            Event::Request(event) => Some(event),
            _ => None,
        }
    }

    pub fn as_request_mut(&mut self) -> Option<&mut RequestEvent> {
        match self {
            Event::Request(event) => Some(event),
            _ => None,
        }
    }
}

impl From<RequestEvent> for Event {
    fn from(event: RequestEvent) -> Self {
        Event::Request(event)
    }
}

impl From<LoginEvent> for Event {
    fn from(event: LoginEvent) -> Self {
        Event::Login(event)
    }
}

impl From<LogoutEvent> for Event {
    fn from(event: LogoutEvent) -> Self {
        Event::Logout(event)
    }
}

impl From<ExpiredEvent> for Event {
    fn from(event: ExpiredEvent) -> Self {
        Event::Expired(event)
    }
}
