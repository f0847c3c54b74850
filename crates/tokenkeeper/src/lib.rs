//! tokenkeeper - JWT credential lifecycle management
//!
//! This library keeps the credentials of an HTTP [`Client`] pipeline. A
//! [`CredentialManager`] logs in, persists the tokens it receives, attaches
//! them to every outgoing request and renews an expired access token before
//! the request leaves. When renewal is impossible it notifies listeners and
//! logs out.
//!
//! # Example
//!
//! ```no_run
//! use serde_json::json;
//! use tokenkeeper::{CredentialManager, JwtConfig, StepConfig};
//! use tokenkeeper_core::{Client, events};
//! use tokenkeeper_http::ReqwestTransport;
//! use tokenkeeper_store::StorageConfig;
//!
//! # async fn example() -> Result<(), tokenkeeper_core::Error> {
//! let client = Client::new(ReqwestTransport::with_base_url("https://api.example.com")?);
//! let config = JwtConfig::new()
//!     .login(StepConfig::new().url("/auth/login"))
//!     .refresh(StepConfig::new().url("/auth/refresh"))
//!     .storage(StorageConfig::file("/var/lib/example/session.json"));
//!
//! let manager = CredentialManager::attach(&client, config)?;
//! client.on(
//!     events::EXPIRED,
//!     0,
//!     tokenkeeper_core::listener_fn(|_| {
//!         eprintln!("session expired, please log in again");
//!         Ok(())
//!     }),
//! );
//!
//! if !manager.is_authenticated() {
//!     manager.login(&json!({"username": "alice", "password": "secret"})).await?;
//! }
//!
//! let me = client.get("/me").await?;
//! println!("{}", me.data);
//! # Ok(())
//! # }
//! ```
//!
//! [`Client`]: tokenkeeper_core::Client

pub mod config;
mod hooks;
pub mod manager;

// Re-export primary types at crate root for convenience
pub use config::{AuthenticateFn, ConfigureFn, JwtConfig, MapFn, StepConfig};
pub use manager::{
    ACTION_LOGIN, ACTION_REFRESH, AUTHENTICATE_PRIORITY, CredentialManager, EXPIRED_PRIORITY,
    REFRESH_PRIORITY,
};

pub use tokenkeeper_core::{Error, Result};
