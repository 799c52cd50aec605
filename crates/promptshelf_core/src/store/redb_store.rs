//! Preference storage backed by a single redb table.

use super::KeyValueStore;
use crate::constants::STORE_FILE_NAME;
use crate::error::ShelfError;
use redb::{ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use tracing::debug;

/// Preference rows keyed by their documented key name.
const PREFERENCES: TableDefinition<&str, &str> = TableDefinition::new("preferences");

/// Durable key/value store living in `<dir>/prefs.redb`.
pub struct RedbStore {
    db: redb::Database,
}

impl RedbStore {
    /// Open (or create) the store inside `dir`.
    ///
    /// # Errors
    /// Returns an error when the directory cannot be created or redb fails to
    /// open the file or initialize the table.
    pub fn open(dir: &Path) -> Result<Self, ShelfError> {
        std::fs::create_dir_all(dir).map_err(|err| {
            ShelfError::StorageMessage(format!(
                "failed to create store directory '{}': {}",
                dir.display(),
                err
            ))
        })?;
        let file = dir.join(STORE_FILE_NAME);
        let db = redb::Database::create(&file)?;
        let write_txn = db.begin_write()?;
        write_txn.open_table(PREFERENCES)?;
        write_txn.commit()?;
        debug!(path = %file.display(), "opened preference store");
        Ok(Self { db })
    }
}

impl KeyValueStore for RedbStore {
    fn get(&self, key: &str) -> Result<Option<String>, ShelfError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PREFERENCES)?;
        Ok(table.get(key)?.map(|value| value.value().to_string()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ShelfError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PREFERENCES)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, ShelfError> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(PREFERENCES)?;
            let existed = table.remove(key)?.is_some();
            existed
        };
        write_txn.commit()?;
        Ok(removed)
    }
}
