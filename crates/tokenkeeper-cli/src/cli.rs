//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::commands::{login, logout, refresh, request, status};

/// Manage a JWT session against an HTTP API.
#[derive(Parser, Debug)]
#[command(name = "tokenkeeper")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub server: ServerArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the API lives and where the session is kept.
#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// API base URL
    #[arg(long, env = "TOKENKEEPER_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Login endpoint, relative to the base URL
    #[arg(long, env = "TOKENKEEPER_LOGIN_PATH", default_value = "/auth/login", global = true)]
    pub login_path: String,

    /// Refresh endpoint, relative to the base URL
    #[arg(long, env = "TOKENKEEPER_REFRESH_PATH", default_value = "/auth/refresh", global = true)]
    pub refresh_path: String,

    /// Session name, one state file per name
    #[arg(long, env = "TOKENKEEPER_SESSION", default_value = "session", global = true)]
    pub session: String,

    /// Directory holding session files
    #[arg(long, env = "TOKENKEEPER_STATE_DIR", global = true)]
    pub state_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and store the received tokens
    Login(login::LoginArgs),

    /// Display the stored session
    Status(status::StatusArgs),

    /// Exchange the refresh token for new tokens
    Refresh(refresh::RefreshArgs),

    /// Discard the stored session
    Logout(logout::LogoutArgs),

    /// Send an authenticated request
    Request(request::RequestArgs),
}
