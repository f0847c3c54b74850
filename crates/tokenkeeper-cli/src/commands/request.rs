//! Request command implementation.

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use tokenkeeper_core::{Method, RequestConfig};

use crate::cli::ServerArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Path relative to the base URL, or an absolute URL
    pub path: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: Method,

    /// JSON request body
    #[arg(short, long)]
    pub data: Option<String>,

    /// Query parameter (key=value), repeatable
    #[arg(short, long = "query", value_name = "KEY=VALUE")]
    pub queries: Vec<String>,

    /// Send the request without credentials
    #[arg(long)]
    pub anonymous: bool,
}

pub async fn run(server: &ServerArgs, args: RequestArgs) -> Result<()> {
    let session = session::open(server)?;

    let mut config = RequestConfig::new(args.method, args.path);
    if let Some(data) = &args.data {
        let data: Value = serde_json::from_str(data).context("Request body is not valid JSON")?;
        config = config.with_data(data);
    }
    if !args.queries.is_empty() {
        config = config.with_params(Value::Object(super::parse_fields(&args.queries)?));
    }
    if args.anonymous {
        config.context.authenticate = Some(false);
    }

    let response = session
        .client
        .request(config)
        .await
        .context("Request failed")?;

    output::json_pretty(&response.data)
}
