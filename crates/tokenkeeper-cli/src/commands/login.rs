//! Login command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::Value;

use crate::cli::ServerArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Username sent as `username`
    #[arg(long)]
    pub username: Option<String>,

    /// Password sent as `password`
    #[arg(long, env = "TOKENKEEPER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Additional credential field (key=value), repeatable
    #[arg(short, long = "field", value_name = "KEY=VALUE")]
    pub fields: Vec<String>,
}

pub async fn run(server: &ServerArgs, args: LoginArgs) -> Result<()> {
    let mut credentials = super::parse_fields(&args.fields)?;
    if let Some(username) = args.username {
        credentials.insert("username".to_string(), Value::String(username));
    }
    if let Some(password) = args.password {
        credentials.insert("password".to_string(), Value::String(password));
    }

    let session = session::open(server)?;

    eprintln!("{}", "Logging in...".dimmed());

    session
        .manager
        .login(&credentials)
        .await
        .context("Failed to login")?;

    output::success("Logged in successfully");
    println!();
    output::timestamp("Token expires", session.manager.token_expiry());
    output::timestamp(
        "Refresh token expires",
        session.manager.refresh_token_expiry(),
    );

    Ok(())
}
