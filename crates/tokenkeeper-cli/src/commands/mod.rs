//! Subcommand implementations.

pub mod login;
pub mod logout;
pub mod refresh;
pub mod request;
pub mod status;

use anyhow::{Context, Result};
use serde_json::{Map, Value};

/// Parse `key=value` pairs into a JSON object. Values that parse as JSON
/// keep their type, anything else is a string.
pub(crate) fn parse_fields(fields: &[String]) -> Result<Map<String, Value>> {
    let mut map = Map::new();
    for field in fields {
        let (key, value) = field
            .split_once('=')
            .with_context(|| format!("Expected key=value, got '{}'", field))?;
        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        map.insert(key.to_string(), value);
    }
    Ok(map)
}
