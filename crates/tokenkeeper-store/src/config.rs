//! Storage configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default store name.
pub const DEFAULT_NAME: &str = "tokenkeeper";

/// Selects and configures a credential store backend.
///
/// ```
/// use tokenkeeper_store::StorageConfig;
///
/// let config: StorageConfig = serde_json::from_str(
///     r#"{"type": "file", "options": {"name": "session", "directory": "/tmp/tk"}}"#,
/// ).unwrap();
/// assert_eq!(config.kind, "file");
/// assert_eq!(config.options.name(), "session");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend discriminator (`memory`, `static`, `file`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub options: StorageOptions,
}

impl StorageConfig {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            options: StorageOptions::default(),
        }
    }

    /// Private in-memory storage.
    pub fn memory() -> Self {
        Self::new("memory")
    }

    /// Process-wide in-memory storage shared by name.
    pub fn shared(name: impl Into<String>) -> Self {
        let mut config = Self::new("static");
        config.options.name = Some(name.into());
        config
    }

    /// File storage at an explicit path.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        let mut config = Self::new("file");
        config.options.path = Some(path.into());
        config
    }
}

/// Backend-specific options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageOptions {
    /// Key the state is stored under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Exact file path (file backends).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Directory holding `<name>.json` (file backends).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    /// Options understood by custom backends.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StorageOptions {
    /// Returns the configured name or the default one.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_NAME)
    }
}
