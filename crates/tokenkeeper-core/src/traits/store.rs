//! Credential store trait.

use std::fmt::Debug;

use crate::Result;
use crate::state::AuthenticationState;

/// Durable persistence of the authentication state.
///
/// Writes always replace the whole stored value. Writing `None` removes it.
pub trait CredentialStore: Debug + Send + Sync {
    /// Short name of the backend, for diagnostics.
    fn kind(&self) -> &str;

    /// Read the stored state, if any.
    fn read(&self) -> Result<Option<AuthenticationState>>;

    /// Replace the stored state.
    fn write(&self, state: Option<&AuthenticationState>) -> Result<()>;
}
