//! Durable key-value storage contract.
//!
//! Modeled on browser local storage: string keys, string values, and nothing
//! else. The session persists its identity under [`USER_KEY`] and the bearer
//! token under [`TOKEN_KEY`]; presence of [`USER_KEY`] is the sole
//! authentication signal across restarts.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

/// Key holding the serialized [`UserIdentity`](crate::UserIdentity).
pub const USER_KEY: &str = "user";

/// Key holding the bearer token attached to outgoing API requests.
pub const TOKEN_KEY: &str = "token";

/// Errors raised by a [`DurableStorage`] backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing medium failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing medium holds data that is not a valid key-value document.
    #[error("storage is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// The backend cannot be used (e.g. a poisoned lock).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Persistent string key-value storage that outlives the process.
///
/// Implementations use interior mutability so a single instance can be shared
/// behind an `Arc` by the session store and the API client.
pub trait DurableStorage: Send + Sync {
    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-local storage, for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a storage pre-populated with entries.
    #[must_use]
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

fn poisoned<T>(_: T) -> StorageError {
    StorageError::Unavailable("memory storage lock poisoned".to_string())
}

impl DurableStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.remove(key);
        Ok(())
    }
}
