//! Persisted multi-select state for one list.

use crate::error::ShelfError;
use crate::models::ItemKey;
use crate::store::{get_json, set_json, SharedStore};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Which bulk actions the current selection allows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionActions {
    pub edit: bool,
    pub delete: bool,
    pub deselect: bool,
}

/// Set of selected identities, written through to the key-value store on
/// every mutation.
///
/// The set is keyed by identity only, so re-filtering or re-rendering the
/// underlying list never changes it.
pub struct SelectionStore {
    storage_key: String,
    selected: BTreeSet<ItemKey>,
    store: SharedStore,
}

impl std::fmt::Debug for SelectionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionStore")
            .field("storage_key", &self.storage_key)
            .field("selected", &self.selected)
            .finish()
    }
}

impl SelectionStore {
    /// Storage key holding the selection of `list`.
    pub fn storage_key(list: &str) -> String {
        format!("selection.{}", list)
    }

    /// Restore the persisted selection of `list`.
    ///
    /// Unreadable or malformed values start an empty selection.
    pub fn load(list: &str, store: SharedStore) -> Self {
        let storage_key = Self::storage_key(list);
        let selected = match get_json::<Vec<ItemKey>>(store.as_ref(), &storage_key) {
            Ok(Some(keys)) => keys.into_iter().collect(),
            Ok(None) => BTreeSet::new(),
            Err(err) => {
                debug!(key = %storage_key, error = %err, "discarding unreadable selection");
                BTreeSet::new()
            }
        };
        Self {
            storage_key,
            selected,
            store,
        }
    }

    /// Flip membership of `key`.
    ///
    /// # Returns
    /// Whether `key` is selected after the toggle.
    ///
    /// # Errors
    /// Returns the storage error when persisting fails; the in-memory toggle
    /// still applies.
    pub fn toggle(&mut self, key: ItemKey) -> Result<bool, ShelfError> {
        let selected = if self.selected.remove(&key) {
            false
        } else {
            self.selected.insert(key);
            true
        };
        self.persist()?;
        Ok(selected)
    }

    pub fn is_selected(&self, key: &ItemKey) -> bool {
        self.selected.contains(key)
    }

    /// Deselect everything.
    ///
    /// # Errors
    /// Returns the storage error when persisting fails.
    pub fn clear(&mut self) -> Result<(), ShelfError> {
        self.selected.clear();
        self.persist()
    }

    /// Keep only identities accepted by `keep`, e.g. after the list shrank.
    ///
    /// # Returns
    /// Number of identities dropped.
    ///
    /// # Errors
    /// Returns the storage error when persisting fails.
    pub fn retain(&mut self, mut keep: impl FnMut(&ItemKey) -> bool) -> Result<usize, ShelfError> {
        let before = self.selected.len();
        self.selected.retain(|key| keep(key));
        let dropped = before - self.selected.len();
        if dropped > 0 {
            self.persist()?;
        }
        Ok(dropped)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ItemKey> + '_ {
        self.selected.iter()
    }

    /// Selected positional indices, ascending.
    pub fn indices(&self) -> Vec<usize> {
        self.selected.iter().filter_map(ItemKey::index).collect()
    }

    /// Selected positional indices, descending, so deleting them one by one
    /// never shifts an index that is still pending.
    pub fn deletion_order(&self) -> Vec<usize> {
        let mut indices = self.indices();
        indices.reverse();
        indices
    }

    pub fn actions(&self) -> SelectionActions {
        match self.selected.len() {
            0 => SelectionActions::default(),
            1 => SelectionActions {
                edit: true,
                delete: true,
                deselect: true,
            },
            _ => SelectionActions {
                edit: false,
                delete: true,
                deselect: true,
            },
        }
    }

    fn persist(&self) -> Result<(), ShelfError> {
        let keys: Vec<&ItemKey> = self.selected.iter().collect();
        set_json(self.store.as_ref(), &self.storage_key, &keys).map_err(|err| {
            warn!(key = %self.storage_key, error = %err, "failed to persist selection");
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterSpec, SearchMode};
    use crate::models::ListItem;
    use crate::store::{KeyValueStore, MemoryStore};
    use std::sync::Arc;

    fn memory() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::default())
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>, ShelfError> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), ShelfError> {
            Err(ShelfError::StorageMessage("disk full".to_string()))
        }

        fn remove(&self, _key: &str) -> Result<bool, ShelfError> {
            Ok(false)
        }
    }

    #[test]
    fn toggle_persists_every_mutation() {
        let store = memory();
        let mut selection = SelectionStore::load("prompts", store.clone());
        assert!(selection.toggle(ItemKey::Index(4)).expect("toggle"));
        assert!(selection.toggle(ItemKey::Index(1)).expect("toggle"));
        assert_eq!(
            store.get("selection.prompts").expect("get").as_deref(),
            Some("[1,4]")
        );

        assert!(!selection.toggle(ItemKey::Index(4)).expect("toggle"));
        assert_eq!(
            store.get("selection.prompts").expect("get").as_deref(),
            Some("[1]")
        );

        let restored = SelectionStore::load("prompts", store);
        assert_eq!(restored.indices(), vec![1]);
    }

    #[test]
    fn double_toggle_with_rerender_restores_original_state() {
        let store = memory();
        let mut selection = SelectionStore::load("loras", store);
        selection.toggle(ItemKey::Index(2)).expect("seed");
        let items: Vec<ListItem> = (0..4)
            .map(|index| ListItem {
                key: ItemKey::Index(index),
                display_name: format!("lora {}", index),
                category: if index % 2 == 0 { "style" } else { "char" }.to_string(),
                searchable_text: format!("lora {}", index),
            })
            .collect();

        for key in [ItemKey::Index(0), ItemKey::Index(2)] {
            let before: Vec<ItemKey> = selection.keys().cloned().collect();
            selection.toggle(key.clone()).expect("first toggle");
            let filter = FilterSpec::new("char", "", SearchMode::Fuzzy).compile();
            let rendered: Vec<bool> = filter
                .apply(&items)
                .map(|item| selection.is_selected(&item.key))
                .collect();
            assert_eq!(rendered.len(), 2);
            selection.toggle(key).expect("second toggle");
            let after: Vec<ItemKey> = selection.keys().cloned().collect();
            assert_eq!(before, after);
        }
    }

    #[test]
    fn actions_follow_selection_size() {
        let mut selection = SelectionStore::load("prompts", memory());
        assert_eq!(selection.actions(), SelectionActions::default());
        selection.toggle(ItemKey::Index(0)).expect("toggle");
        assert_eq!(
            selection.actions(),
            SelectionActions {
                edit: true,
                delete: true,
                deselect: true
            }
        );
        selection.toggle(ItemKey::Index(5)).expect("toggle");
        assert!(!selection.actions().edit);
        assert!(selection.actions().delete);
        selection.clear().expect("clear");
        assert!(selection.is_empty());
    }

    #[test]
    fn deletion_order_is_descending() {
        let mut selection = SelectionStore::load("prompts", memory());
        for index in [3, 10, 0, 7] {
            selection.toggle(ItemKey::Index(index)).expect("toggle");
        }
        assert_eq!(selection.deletion_order(), vec![10, 7, 3, 0]);
    }

    #[test]
    fn retain_drops_stale_identities() {
        let store = memory();
        let mut selection = SelectionStore::load("prompts", store.clone());
        for index in [1, 6, 9] {
            selection.toggle(ItemKey::Index(index)).expect("toggle");
        }
        let dropped = selection
            .retain(|key| key.index().is_some_and(|index| index < 5))
            .expect("retain");
        assert_eq!(dropped, 2);
        assert_eq!(
            store.get("selection.prompts").expect("get").as_deref(),
            Some("[1]")
        );
    }

    #[test]
    fn malformed_persisted_selection_starts_empty() {
        let store = memory();
        store.set("selection.refs", "{oops").expect("set");
        let selection = SelectionStore::load("refs", store);
        assert!(selection.is_empty());
    }

    #[test]
    fn persistence_failure_keeps_in_memory_toggle() {
        let mut selection = SelectionStore::load("prompts", Arc::new(FailingStore));
        let result = selection.toggle(ItemKey::Index(2));
        assert!(matches!(result, Err(ShelfError::StorageMessage(_))));
        assert!(selection.is_selected(&ItemKey::Index(2)));
    }
}
