//! Client-local session storage backends.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use market_core::error::AppError;
use market_core::result::AppResult;
use market_core::traits::SessionStorage;

/// Session storage held in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySessionStorage {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().map(|e| e.is_empty()).unwrap_or(false)
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| AppError::storage("Session storage lock poisoned"))
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_many(&self, entries: &[(&str, String)]) -> AppResult<()> {
        let mut map = self.lock()?;
        for (key, value) in entries {
            map.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> AppResult<()> {
        let mut map = self.lock()?;
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

/// Session storage persisted as a JSON object on disk.
///
/// Every batch rewrites the whole file through a temporary sibling and a
/// rename, so a crash leaves either the old or the new set of values.
#[derive(Debug)]
pub struct FileSessionStorage {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileSessionStorage {
    /// Opens (or lazily creates) the store at `path`.
    ///
    /// An unreadable or corrupt file starts the store empty; the session
    /// it held is treated as gone.
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Discarding corrupt session file");
                HashMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| AppError::storage("Session storage lock poisoned"))
    }

    fn persist(&self, entries: &HashMap<String, String>) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), keys = entries.len(), "Session file written");
        Ok(())
    }
}

impl SessionStorage for FileSessionStorage {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_many(&self, entries: &[(&str, String)]) -> AppResult<()> {
        let mut map = self.lock()?;
        let mut next = map.clone();
        for (key, value) in entries {
            next.insert((*key).to_string(), value.clone());
        }
        self.persist(&next)?;
        *map = next;
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> AppResult<()> {
        let mut map = self.lock()?;
        let mut next = map.clone();
        for key in keys {
            next.remove(*key);
        }
        self.persist(&next)?;
        *map = next;
        Ok(())
    }
}
