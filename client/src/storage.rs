//! Local persistence of the todo list.
//!
//! [`ItemStore`] reads and writes the whole list as one JSON array under the
//! fixed key [`STORAGE_KEY`] of a [`KeyValueStore`] backend. Two backends are
//! provided: an in-memory map and a directory of JSON files.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tempfile::NamedTempFile;
use todos_core::{StorageError, TodoItem, environment::KeyValueStore};
use tracing::{debug, warn};

/// Key the list is stored under
pub const STORAGE_KEY: &str = "todos";

/// Loads and saves the todo list through a key-value backend
#[derive(Debug, Clone)]
pub struct ItemStore<K> {
    backend: K,
}

impl<K: KeyValueStore> ItemStore<K> {
    /// Creates an item store over `backend`
    #[must_use]
    pub const fn new(backend: K) -> Self {
        Self { backend }
    }

    /// The underlying backend
    #[must_use]
    pub const fn backend(&self) -> &K {
        &self.backend
    }

    /// Load the persisted list
    ///
    /// Returns an empty list when nothing was stored yet, the backend cannot
    /// be read, or the stored text is not a JSON array of items. The last two
    /// cases are logged.
    #[must_use]
    pub fn load(&self) -> Vec<TodoItem> {
        let text = match self.backend.get(STORAGE_KEY) {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!(key = STORAGE_KEY, "Nothing stored yet");
                return Vec::new();
            },
            Err(e) => {
                warn!(key = STORAGE_KEY, error = %e, "Failed to read stored items, starting empty");
                return Vec::new();
            },
        };

        match serde_json::from_str::<Vec<TodoItem>>(&text) {
            Ok(items) => {
                debug!(key = STORAGE_KEY, count = items.len(), "Loaded stored items");
                items
            },
            Err(e) => {
                warn!(key = STORAGE_KEY, error = %e, "Stored items are unreadable, starting empty");
                Vec::new()
            },
        }
    }

    /// Overwrite the persisted list with `items`
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the list cannot be encoded or the backend
    /// write fails.
    pub fn save(&self, items: &[TodoItem]) -> Result<(), StorageError> {
        let text = serde_json::to_string(items)?;
        self.backend.set(STORAGE_KEY, &text)?;
        debug!(key = STORAGE_KEY, count = items.len(), "Saved items");
        Ok(())
    }
}

/// In-memory backend
///
/// Clones share the same map, so a test can keep one handle and inspect what
/// the controller wrote through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKeyValueStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `value` under `key`
    #[must_use]
    pub fn with_value(key: &str, value: &str) -> Self {
        let store = Self::new();
        store
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        store
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Directory-backed store: one `<key>.json` file per key
///
/// Writes go to a uniquely named temporary file in the same directory which
/// is then renamed over the target, so readers never see a partial value and
/// the last writer wins.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Creates a store rooted at `dir`; the directory is created on first write
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the files
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(self.dir.join(format!("{key}.json")))
        } else {
            Err(StorageError::InvalidKey(key.to_string()))
        }
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;

        // Unique per write, so concurrent writers never share a temp file
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }
}
