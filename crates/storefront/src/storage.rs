//! File-backed durable storage.
//!
//! Entries live in a single JSON object on disk:
//!
//! ```json
//! { "user": "{\"id\":1,...}", "token": "eyJhbGciOi..." }
//! ```
//!
//! Every call re-reads the file, so edits made while the storefront is
//! running are picked up. Writes go to a uniquely named temp file in the same
//! directory, which is synced and then persisted over the original, so a
//! crash mid-write never leaves a truncated document behind. The file holds
//! the bearer token and is kept owner-only (0o600) on Unix.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;

use shopfront_core::{DurableStorage, StorageError};

type Entries = BTreeMap<String, String>;

#[cfg(unix)]
const OWNER_ONLY_MODE: u32 = 0o600;

/// Durable storage backed by a JSON file.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Use `path` as the backing file. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<Entries, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(Entries::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_entries(&self, entries: &Entries) -> Result<(), StorageError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut tmp = NamedTempFile::new_in(parent)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(tmp.path(), fs::Permissions::from_mode(OWNER_ONLY_MODE))?;
        }

        tmp.write_all(&serde_json::to_vec_pretty(entries)?)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(OWNER_ONLY_MODE))?;
        }
        Ok(())
    }

    /// Apply `change` to the current entries and write the result.
    ///
    /// A corrupt file is replaced rather than blocking writes forever.
    fn modify(&self, change: impl FnOnce(&mut Entries)) -> Result<(), StorageError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StorageError::Unavailable("file storage lock poisoned".to_string()))?;

        let mut entries = match self.read_entries() {
            Ok(entries) => entries,
            Err(StorageError::Corrupt(e)) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Overwriting corrupt storage file"
                );
                Entries::new()
            }
            Err(e) => return Err(e),
        };

        change(&mut entries);
        self.write_entries(&entries)
    }
}

impl DurableStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.modify(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        if !self.path.exists() {
            return Ok(());
        }
        self.modify(|entries| {
            entries.remove(key);
        })
    }
}
