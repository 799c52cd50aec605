//! Durable string key/value storage for UI preferences and selections.

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::error::ShelfError;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

/// Synchronous string key/value storage.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    /// Returns an error when the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, ShelfError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// Returns an error when the write cannot be committed.
    fn set(&self, key: &str, value: &str) -> Result<(), ShelfError>;

    /// Delete `key`.
    ///
    /// # Returns
    /// `true` when a value was removed.
    ///
    /// # Errors
    /// Returns an error when the write cannot be committed.
    fn remove(&self, key: &str) -> Result<bool, ShelfError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, ShelfError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ShelfError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<bool, ShelfError> {
        (**self).remove(key)
    }
}

/// Shared, type-erased store handle.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// Read a JSON-encoded value.
///
/// # Errors
/// Returns an error when storage access or decoding fails.
pub fn get_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, ShelfError> {
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Write a JSON-encoded value.
///
/// # Errors
/// Returns an error when encoding or the write fails.
pub fn set_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), ShelfError> {
    let encoded = serde_json::to_string(value)?;
    store.set(key, &encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::setup_temp_store;

    fn exercise(store: &dyn KeyValueStore) {
        assert_eq!(store.get("promptTheme").expect("get"), None);
        store.set("promptTheme", "dark").expect("set");
        assert_eq!(store.get("promptTheme").expect("get").as_deref(), Some("dark"));
        store.set("promptTheme", "light").expect("overwrite");
        assert_eq!(store.get("promptTheme").expect("get").as_deref(), Some("light"));
        assert!(store.remove("promptTheme").expect("remove"));
        assert!(!store.remove("promptTheme").expect("remove again"));
        assert_eq!(store.get("promptTheme").expect("get"), None);
    }

    #[test]
    fn memory_store_round_trips_values() {
        exercise(&MemoryStore::default());
    }

    #[test]
    fn redb_store_round_trips_values() {
        let (store, _dir) = setup_temp_store();
        exercise(&store);
    }

    #[test]
    fn redb_store_persists_across_reopen() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        {
            let store = RedbStore::open(dir.path()).expect("open");
            set_json(&store, "selection.prompts", &[1usize, 4]).expect("set json");
        }
        let reopened = RedbStore::open(dir.path()).expect("reopen");
        let value: Option<Vec<usize>> =
            get_json(&reopened, "selection.prompts").expect("get json");
        assert_eq!(value, Some(vec![1, 4]));
    }

    #[test]
    fn get_json_reports_malformed_values() {
        let store = MemoryStore::default();
        store.set("selection.loras", "not json").expect("set");
        let result: Result<Option<Vec<usize>>, _> = get_json(&store, "selection.loras");
        assert!(matches!(result, Err(ShelfError::Serialization(_))));
    }
}
