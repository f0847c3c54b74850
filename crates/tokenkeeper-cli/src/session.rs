//! Session wiring: HTTP client, credential manager and state file.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use directories::ProjectDirs;

use tokenkeeper::{CredentialManager, JwtConfig, StepConfig};
use tokenkeeper_core::{Client, Method, listener_fn};
use tokenkeeper_core::events;
use tokenkeeper_http::ReqwestTransport;
use tokenkeeper_store::StorageConfig;

use crate::cli::ServerArgs;
use crate::output;

/// A client with a credential manager attached.
pub struct CliSession {
    pub client: Client,
    pub manager: Arc<CredentialManager>,
}

/// Directory holding the session files.
fn state_dir(server: &ServerArgs) -> Result<PathBuf> {
    let dir = match &server.state_dir {
        Some(dir) => dir.clone(),
        None => ProjectDirs::from("", "", "tokenkeeper")
            .context("Could not determine data directory")?
            .data_dir()
            .to_path_buf(),
    };

    fs::create_dir_all(&dir).context("Failed to create data directory")?;
    Ok(dir)
}

fn storage(server: &ServerArgs) -> Result<StorageConfig> {
    let mut storage = StorageConfig::new("file");
    storage.options.name = Some(server.session.clone());
    storage.options.directory = Some(state_dir(server)?);
    Ok(storage)
}

/// Open the stored session.
pub fn open(server: &ServerArgs) -> Result<CliSession> {
    let transport = match &server.base_url {
        Some(base_url) => ReqwestTransport::with_base_url(base_url).context("Invalid base URL")?,
        None => ReqwestTransport::new().context("Failed to create HTTP client")?,
    };
    let client = Client::new(transport);

    let config = JwtConfig::new()
        .login(
            StepConfig::new()
                .url(&server.login_path)
                .method(Method::Post),
        )
        .refresh(StepConfig::new().url(&server.refresh_path))
        .storage(storage(server)?);

    let manager =
        CredentialManager::attach(&client, config).context("Failed to load session")?;

    client.on(
        events::EXPIRED,
        0,
        listener_fn(|_| {
            output::warning("Session expired. Run 'tokenkeeper login' again.");
            Ok(())
        }),
    );

    Ok(CliSession { client, manager })
}

/// Open the stored session, failing if nobody is logged in.
pub fn open_authenticated(server: &ServerArgs) -> Result<CliSession> {
    let session = open(server)?;
    anyhow::ensure!(
        session.manager.is_authenticated(),
        "No active session. Run 'tokenkeeper login' first."
    );
    Ok(session)
}
