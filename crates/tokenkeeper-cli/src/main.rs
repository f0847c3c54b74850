//! tokenkeeper - CLI tool for managing JWT sessions.
//!
//! This is a thin wrapper over the `tokenkeeper` library: it logs in against
//! an HTTP API, keeps the tokens in a file and sends authenticated requests,
//! refreshing the access token when it has expired.

mod cli;
mod commands;
mod output;
mod session;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.json_logs);

    let server = cli.server;
    match cli.command {
        Commands::Login(args) => commands::login::run(&server, args).await,
        Commands::Status(args) => commands::status::run(&server, args).await,
        Commands::Refresh(args) => commands::refresh::run(&server, args).await,
        Commands::Logout(args) => commands::logout::run(&server, args).await,
        Commands::Request(args) => commands::request::run(&server, args).await,
    }
}

fn init_logging(verbosity: u8, json: bool) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so command output stays parseable.
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
