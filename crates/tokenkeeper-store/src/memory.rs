//! In-memory credential store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};

use tokenkeeper_core::{AuthenticationState, CredentialStore, Result};

type Cell = Arc<RwLock<Option<AuthenticationState>>>;

/// Named cells backing the `static` storage type.
fn shared_cells() -> &'static Mutex<HashMap<String, Cell>> {
    static CELLS: OnceLock<Mutex<HashMap<String, Cell>>> = OnceLock::new();
    CELLS.get_or_init(Default::default)
}

/// Credential store kept in memory.
///
/// A private store lives as long as its owner. A shared store is keyed by
/// name and outlives its owner, so re-resolving the same `static` storage
/// finds the state written before.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    kind: &'static str,
    cell: Cell,
}

impl MemoryStore {
    /// Create a private store.
    pub fn new() -> Self {
        Self {
            kind: "memory",
            cell: Cell::default(),
        }
    }

    /// Open the process-wide store named `name`.
    pub fn shared(name: &str) -> Self {
        let mut cells = shared_cells().lock().unwrap_or_else(PoisonError::into_inner);
        let cell = cells.entry(name.to_string()).or_default();
        Self {
            kind: "static",
            cell: Arc::clone(cell),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for MemoryStore {
    fn kind(&self) -> &str {
        self.kind
    }

    fn read(&self) -> Result<Option<AuthenticationState>> {
        Ok(self
            .cell
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn write(&self, state: Option<&AuthenticationState>) -> Result<()> {
        *self.cell.write().unwrap_or_else(PoisonError::into_inner) = state.cloned();
        Ok(())
    }
}
