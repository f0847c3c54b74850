//! tokenkeeper-store - Credential store backends.
//!
//! Backends are selected by a `type` discriminator through
//! [`StorageFactory`]:
//!
//! | type | backend |
//! |---|---|
//! | `memory` | [`MemoryStore`] private to one manager |
//! | `static` | [`MemoryStore`] shared process-wide by name |
//! | `file`, `localStorage` | [`FileStore`], one JSON file per name |

mod config;
mod factory;
mod file;
mod memory;

pub use config::{DEFAULT_NAME, StorageConfig, StorageOptions};
pub use factory::{BackendBuilder, StorageFactory};
pub use file::FileStore;
pub use memory::MemoryStore;
