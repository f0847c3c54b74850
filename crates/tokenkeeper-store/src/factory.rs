//! Backend selection by storage type.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use tokenkeeper_core::error::StorageError;
use tokenkeeper_core::{CredentialStore, Result};

use crate::config::{StorageConfig, StorageOptions};
use crate::file::FileStore;
use crate::memory::MemoryStore;

/// Builds a store from backend options.
pub type BackendBuilder =
    Arc<dyn Fn(&StorageOptions) -> Result<Arc<dyn CredentialStore>> + Send + Sync>;

/// Creates credential stores from a [`StorageConfig`].
///
/// The factory knows the built-in backends; custom ones can be added with
/// [`StorageFactory::register`].
#[derive(Clone)]
pub struct StorageFactory {
    backends: HashMap<String, BackendBuilder>,
}

impl StorageFactory {
    /// Create a factory with the built-in backends.
    pub fn new() -> Self {
        let mut factory = Self {
            backends: HashMap::new(),
        };

        factory.register("memory", memory_backend);
        factory.register("static", static_backend);
        factory.register("file", file_backend);
        factory.register("localStorage", file_backend);

        factory
    }

    /// Register (or replace) the backend for `kind`.
    pub fn register<F>(&mut self, kind: impl Into<String>, builder: F) -> &mut Self
    where
        F: Fn(&StorageOptions) -> Result<Arc<dyn CredentialStore>> + Send + Sync + 'static,
    {
        self.backends.insert(kind.into(), Arc::new(builder));
        self
    }

    /// Returns `true` if a backend is registered for `kind`.
    pub fn supports(&self, kind: &str) -> bool {
        self.backends.contains_key(kind)
    }

    /// Build the store described by `config`.
    pub fn create(&self, config: &StorageConfig) -> Result<Arc<dyn CredentialStore>> {
        let builder = self
            .backends
            .get(&config.kind)
            .ok_or_else(|| StorageError::UnknownBackend {
                kind: config.kind.clone(),
            })?;

        debug!(kind = %config.kind, name = config.options.name(), "Creating credential store");
        builder(&config.options)
    }
}

impl Default for StorageFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StorageFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.backends.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("StorageFactory")
            .field("backends", &kinds)
            .finish()
    }
}

fn memory_backend(_options: &StorageOptions) -> Result<Arc<dyn CredentialStore>> {
    Ok(Arc::new(MemoryStore::new()))
}

fn static_backend(options: &StorageOptions) -> Result<Arc<dyn CredentialStore>> {
    Ok(Arc::new(MemoryStore::shared(options.name())))
}

fn file_backend(options: &StorageOptions) -> Result<Arc<dyn CredentialStore>> {
    let store = match (&options.path, &options.directory) {
        (Some(path), _) => FileStore::new(path),
        (None, Some(directory)) => FileStore::in_directory(directory, options.name()),
        (None, None) => {
            return Err(StorageError::InvalidOptions {
                kind: "file".to_string(),
                reason: "either 'path' or 'directory' is required".to_string(),
            }
            .into());
        }
    };
    Ok(Arc::new(store))
}
