#![allow(dead_code)]

use std::path::Path;
use std::process::Output;

use jsonwebtoken::{EncodingKey, Header};
use serde_json::{Value, json};
use tokio::process::Command;

/// Build an HS256 JWT with the given payload.
pub fn jwt(payload: Value) -> String {
    jsonwebtoken::encode(
        &Header::default(),
        &payload,
        &EncodingKey::from_secret(b"test-issuer"),
    )
    .unwrap()
}

/// A JWT for `subject` expiring `offset` seconds from now.
pub fn jwt_expiring_in(subject: &str, offset: i64) -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;
    jwt(json!({"sub": subject, "exp": now + offset}))
}

/// Run the CLI with an isolated state directory.
pub async fn run_cli(args: &[&str], state_dir: &Path, base_url: &str) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tokenkeeper"));
    cmd.args(args);
    cmd.env("TOKENKEEPER_STATE_DIR", state_dir);
    cmd.env("TOKENKEEPER_BASE_URL", base_url);
    cmd.env_remove("TOKENKEEPER_PASSWORD");
    cmd.env("NO_COLOR", "1");
    cmd.output().await.expect("Failed to execute CLI")
}

/// Run the CLI and expect success.
pub async fn run_cli_success(args: &[&str], state_dir: &Path, base_url: &str) -> String {
    let output = run_cli(args, state_dir, base_url).await;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
    }
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Run the CLI and expect failure, returning stderr.
pub async fn run_cli_failure(args: &[&str], state_dir: &Path, base_url: &str) -> String {
    let output = run_cli(args, state_dir, base_url).await;
    if output.status.success() {
        panic!("CLI command should have failed: {:?}", args);
    }
    String::from_utf8_lossy(&output.stderr).to_string()
}
