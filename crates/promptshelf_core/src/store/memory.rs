//! In-process store used by tests and read-only sessions.

use super::KeyValueStore;
use crate::error::ShelfError;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Mutex-guarded map; values vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    fn entries(&self) -> Result<MutexGuard<'_, HashMap<String, String>>, ShelfError> {
        self.entries
            .lock()
            .map_err(|_| ShelfError::StorageMessage("memory store lock poisoned".to_string()))
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, ShelfError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ShelfError> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, ShelfError> {
        Ok(self.entries()?.remove(key).is_some())
    }
}
