//! Refresh command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use crate::cli::ServerArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct RefreshArgs {}

pub async fn run(server: &ServerArgs, _args: RefreshArgs) -> Result<()> {
    let session = session::open_authenticated(server)?;

    eprintln!("{}", "Refreshing session...".dimmed());

    session
        .manager
        .refresh(None)
        .await
        .context("Failed to refresh session")?;

    output::success("Session refreshed successfully");
    output::timestamp("Token expires", session.manager.token_expiry());

    Ok(())
}
