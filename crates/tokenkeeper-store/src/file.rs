//! Filesystem credential store.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, instrument, warn};

use tokenkeeper_core::error::StorageError;
use tokenkeeper_core::{AuthenticationState, CredentialStore, Error, Result};

fn map_io(path: &Path, err: std::io::Error) -> Error {
    Error::Storage(StorageError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}

/// Credential store persisting the state as a JSON file.
///
/// Writes go to a temporary file that is renamed over the target while an
/// exclusive lock is held, so readers never see a partially written state.
/// On Unix the file is only readable by its owner.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store backed by the file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Create a store for `<directory>/<name>.json`.
    pub fn in_directory(directory: impl AsRef<Path>, name: &str) -> Self {
        Self::new(directory.as_ref().join(format!("{}.json", name)))
    }

    /// Path of the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("tmp")
    }

    fn lock(&self) -> Result<File> {
        let lock_path = self.lock_path();
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(|e| map_io(parent, e))?;
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| map_io(&lock_path, e))?;

        lock_file
            .lock_exclusive()
            .map_err(|e| map_io(&lock_path, e))?;
        Ok(lock_file)
    }

    fn replace(&self, state: &AuthenticationState) -> Result<()> {
        let json = serde_json::to_vec_pretty(state).map_err(|e| {
            Error::Storage(StorageError::Serialization {
                message: e.to_string(),
            })
        })?;

        let temp_path = self.temp_path();
        let mut file = File::create(&temp_path).map_err(|e| map_io(&temp_path, e))?;
        file.write_all(&json).map_err(|e| map_io(&temp_path, e))?;
        file.sync_data().map_err(|e| map_io(&temp_path, e))?;

        // Set restrictive permissions (Unix only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&temp_path, perms).map_err(|e| map_io(&temp_path, e))?;
        }

        fs::rename(&temp_path, &self.path).map_err(|e| map_io(&self.path, e))
    }

    fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(map_io(&self.path, e)),
        }
    }
}

impl CredentialStore for FileStore {
    fn kind(&self) -> &str {
        "file"
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn read(&self) -> Result<Option<AuthenticationState>> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No stored credentials");
                return Ok(None);
            }
            Err(e) => return Err(map_io(&self.path, e)),
        };

        match serde_json::from_str(&json) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable credentials file");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, state), fields(path = %self.path.display(), present = state.is_some()))]
    fn write(&self, state: Option<&AuthenticationState>) -> Result<()> {
        let lock_file = self.lock()?;

        let result = match state {
            Some(state) => self.replace(state),
            None => self.remove(),
        };

        lock_file
            .unlock()
            .map_err(|e| map_io(&self.lock_path(), e))?;

        debug!("Credentials written");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn state() -> AuthenticationState {
        AuthenticationState::new("t1")
            .unwrap()
            .with_token_expiry(Some(100))
            .with_refresh_token("r1", Some(200))
            .with_established_at(50)
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::in_directory(dir.path(), "session");
        assert_eq!(store.read().unwrap(), None);
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::in_directory(dir.path().join("nested"), "session");

        store.write(Some(&state())).unwrap();
        assert!(store.path().ends_with("nested/session.json"));
        assert_eq!(store.read().unwrap(), Some(state()));

        // A second handle on the same file sees the same state.
        let other = FileStore::new(store.path());
        assert_eq!(other.read().unwrap(), Some(state()));
    }

    #[test]
    fn writing_none_removes_file() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::in_directory(dir.path(), "session");

        store.write(Some(&state())).unwrap();
        store.write(None).unwrap();
        store.write(None).unwrap();

        assert!(!store.path().exists());
        assert_eq!(store.read().unwrap(), None);
    }

    #[test]
    fn corrupt_file_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::in_directory(dir.path(), "session");
        fs::write(store.path(), "{not json").unwrap();
        assert_eq!(store.read().unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = FileStore::in_directory(dir.path(), "session");
        store.write(Some(&state())).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
