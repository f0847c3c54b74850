//! Core traits for transport and persistence behavior.

mod store;
mod transport;

pub use store::CredentialStore;
pub use transport::Transport;
