//! Logout command implementation.

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::ServerArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct LogoutArgs {}

pub async fn run(server: &ServerArgs, _args: LogoutArgs) -> Result<()> {
    let session = session::open(server)?;

    if !session.manager.is_authenticated() {
        output::success("Already logged out");
        return Ok(());
    }

    session
        .manager
        .logout()
        .await
        .context("Failed to remove session")?;

    output::success("Logged out");
    Ok(())
}
