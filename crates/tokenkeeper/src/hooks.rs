//! Listeners the manager registers on its client.
//!
//! They hold a weak reference so that the client does not keep a dropped
//! manager alive; once the manager is gone they do nothing.

use std::sync::Weak;

use async_trait::async_trait;
use tracing::debug;

use tokenkeeper_core::{Event, Listener, Result};

use crate::manager::CredentialManager;

/// Refreshes expired credentials before a request is sent.
pub(crate) struct RefreshCheck {
    manager: Weak<CredentialManager>,
}

impl RefreshCheck {
    pub(crate) fn new(manager: Weak<CredentialManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl Listener for RefreshCheck {
    async fn handle(&self, event: &mut Event) -> Result<()> {
        let (Some(manager), Some(request)) = (self.manager.upgrade(), event.as_request()) else {
            return Ok(());
        };
        manager.refresh_credentials(request).await
    }
}

/// Attaches the current credentials to a request.
pub(crate) struct Authenticate {
    manager: Weak<CredentialManager>,
}

impl Authenticate {
    pub(crate) fn new(manager: Weak<CredentialManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl Listener for Authenticate {
    async fn handle(&self, event: &mut Event) -> Result<()> {
        let (Some(manager), Some(request)) = (self.manager.upgrade(), event.as_request_mut())
        else {
            return Ok(());
        };
        manager.authenticate_request(&mut request.config)
    }
}

/// Logs out once credentials are known to be unrecoverable.
pub(crate) struct CredentialsExpired {
    manager: Weak<CredentialManager>,
}

impl CredentialsExpired {
    pub(crate) fn new(manager: Weak<CredentialManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl Listener for CredentialsExpired {
    async fn handle(&self, event: &mut Event) -> Result<()> {
        let (Some(manager), Event::Expired(expired)) = (self.manager.upgrade(), &*event) else {
            return Ok(());
        };
        debug!(error = %expired.error, "Credentials expired, logging out");
        manager.logout().await
    }
}
