//! tokenkeeper-core - Core types and traits for the tokenkeeper credential manager.
//!
//! This crate holds everything the credential manager and its collaborators
//! share: the request pipeline ([`Client`]), the priority-ordered event bus
//! ([`Dispatcher`]), the authentication state, claims decoding and the
//! [`Transport`] and [`CredentialStore`] seams.

pub mod claims;
pub mod client;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod request;
pub mod state;
pub mod traits;

pub use claims::{Claims, DecodeOptions};
pub use client::Client;
pub use dispatcher::{Dispatcher, Listener, Subscription, listener_fn};
pub use error::Error;
pub use events::{Event, ExpiredEvent, LoginEvent, LogoutEvent, RequestEvent};
pub use request::{Method, RequestConfig, RequestContext, Response};
pub use state::AuthenticationState;
pub use traits::{CredentialStore, Transport};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
