//! Status command implementation.

use anyhow::Result;
use clap::Args;
use serde_json::json;

use crate::cli::ServerArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print the status as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(server: &ServerArgs, args: StatusArgs) -> Result<()> {
    let session = session::open(server)?;
    let manager = &session.manager;

    let subject = manager
        .token()
        .and_then(|token| manager.decode(&token, None).ok())
        .and_then(|claims| claims.get("sub").and_then(|sub| sub.as_str()).map(str::to_string));

    if args.json {
        return output::json_pretty(&json!({
            "authenticated": manager.is_authenticated(),
            "subject": subject,
            "token_expired": manager.is_token_expired(),
            "token_expiry": manager.token_expiry(),
            "refresh_token_expired": manager.is_refresh_token_expired(),
            "refresh_token_expiry": manager.refresh_token_expiry(),
            "credentials_expired": manager.is_credentials_expired(),
            "authenticated_at": manager.authentication_date().map(|date| date.to_rfc3339()),
        }));
    }

    if !manager.is_authenticated() {
        output::field("Status", "logged out");
        return Ok(());
    }

    let status = match manager.is_credentials_expired() {
        Some(true) => "expired",
        _ if manager.is_token_expired() => "refresh needed",
        _ => "active",
    };
    output::field("Status", status);
    if let Some(subject) = &subject {
        output::field("Subject", subject);
    }
    output::timestamp("Token expires", manager.token_expiry());
    output::timestamp("Refresh token expires", manager.refresh_token_expiry());
    if let Some(date) = manager.authentication_date() {
        output::field("Logged in", &date.to_rfc3339());
    }

    Ok(())
}
