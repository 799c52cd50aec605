//! One list view: pagination, filtering, selection, and detail mode bundled
//! over a single item type.

use crate::error::ShelfError;
use crate::filter::{FilterSpec, ItemFilter, SearchMode};
use crate::models::{ItemKey, LibraryItem, ListItem};
use crate::pagination::{ListQuery, LoadOutcome, PageSource, PaginatedList, PaginationState};
use crate::preferences::{PreferenceKey, Preferences};
use crate::selection::{SelectionActions, SelectionStore};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Static description of a list view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewOptions {
    /// List name; also names the persisted selection.
    pub name: String,
    /// Preference holding this view's detail-mode flag.
    pub detail_key: PreferenceKey,
    pub page_size: usize,
    /// Send category and query to the source instead of filtering locally.
    pub server_filtering: bool,
}

impl ViewOptions {
    pub fn prompts(page_size: usize) -> Self {
        Self {
            name: "prompts".to_string(),
            detail_key: PreferenceKey::PromptDetailMode,
            page_size,
            server_filtering: false,
        }
    }

    pub fn loras(page_size: usize) -> Self {
        Self {
            name: "loras".to_string(),
            detail_key: PreferenceKey::LoraDetailMode,
            page_size,
            server_filtering: false,
        }
    }

    pub fn references(page_size: usize) -> Self {
        Self {
            name: "references".to_string(),
            detail_key: PreferenceKey::ReaderDetailMode,
            page_size,
            server_filtering: true,
        }
    }
}

/// A filtered item as a front end renders it.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleItem<T> {
    pub key: ItemKey,
    pub selected: bool,
    pub item: T,
}

#[derive(Default)]
struct IndexCache {
    session: u64,
    entries: Vec<ListItem>,
}

/// Generic list view shared by prompts, Loras, and reference items.
pub struct LibraryView<T, S> {
    options: ViewOptions,
    list: PaginatedList<T, S>,
    index: Mutex<IndexCache>,
    filter: FilterSpec,
    compiled: ItemFilter,
    selection: SelectionStore,
    preferences: Preferences,
    detail_mode: bool,
}

impl<T, S> LibraryView<T, S>
where
    T: Clone + LibraryItem,
    S: PageSource<T>,
{
    /// Build a view, restoring its selection and detail mode from
    /// `preferences`.
    pub fn new(options: ViewOptions, source: S, preferences: Preferences) -> Self {
        let list = PaginatedList::new(options.name.clone(), source, options.page_size);
        let selection = SelectionStore::load(&options.name, preferences.store().clone());
        let detail_mode = preferences.flag(options.detail_key);
        let filter = FilterSpec::default();
        Self {
            compiled: filter.compile(),
            index: Mutex::new(IndexCache {
                session: list.session_id(),
                entries: Vec::new(),
            }),
            options,
            list,
            filter,
            selection,
            preferences,
            detail_mode,
        }
    }

    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    pub fn list(&self) -> &PaginatedList<T, S> {
        &self.list
    }

    pub fn state(&self) -> PaginationState {
        self.list.state()
    }

    /// Query sent to the source for the current filter.
    pub fn query(&self) -> ListQuery {
        if self.options.server_filtering {
            ListQuery::new(Some(&self.filter.category), Some(&self.filter.query))
        } else {
            ListQuery::default()
        }
    }

    /// Load the next page for the current filter.
    pub async fn load_more(&self) -> LoadOutcome {
        self.list.load_next_page(&self.query()).await
    }

    /// Discard loaded items and load the first page again.
    pub async fn reload(&self) -> LoadOutcome {
        self.list.reset();
        self.load_more().await
    }

    pub fn filter(&self) -> &FilterSpec {
        &self.filter
    }

    /// Replace the filter. The selection is kept.
    ///
    /// # Returns
    /// `true` when the filter changed.
    pub fn set_filter(&mut self, filter: FilterSpec) -> bool {
        if filter == self.filter {
            return false;
        }
        debug!(list = %self.options.name, ?filter, "filter changed");
        self.compiled = filter.compile();
        self.filter = filter;
        true
    }

    pub fn set_category(&mut self, category: &str) -> bool {
        let filter = FilterSpec {
            category: category.to_string(),
            ..self.filter.clone()
        };
        self.set_filter(filter)
    }

    pub fn set_query(&mut self, query: &str) -> bool {
        let filter = FilterSpec {
            query: query.to_string(),
            ..self.filter.clone()
        };
        self.set_filter(filter)
    }

    pub fn set_mode(&mut self, mode: SearchMode) -> bool {
        let filter = FilterSpec {
            mode,
            ..self.filter.clone()
        };
        self.set_filter(filter)
    }

    fn index(&self) -> MutexGuard<'_, IndexCache> {
        let mut cache = self.index.lock().unwrap_or_else(PoisonError::into_inner);
        let session = self.list.session_id();
        if cache.session != session {
            cache.session = session;
            cache.entries.clear();
        }
        self.list.with_items(|items| {
            if items.len() < cache.entries.len() {
                cache.entries.clear();
            }
            let start = cache.entries.len();
            let fresh = items[start..]
                .iter()
                .enumerate()
                .map(|(offset, item)| ListItem::from_item(start + offset, item));
            cache.entries.extend(fresh);
        });
        cache
    }

    /// Loaded items passing the filter, in list order, with selection flags.
    pub fn visible(&self) -> Vec<VisibleItem<T>> {
        let cache = self.index();
        self.list.with_items(|items| {
            cache
                .entries
                .iter()
                .zip(items)
                .filter(|(entry, _)| self.options.server_filtering || self.compiled.matches(entry))
                .map(|(entry, item)| VisibleItem {
                    key: entry.key.clone(),
                    selected: self.selection.is_selected(&entry.key),
                    item: item.clone(),
                })
                .collect()
        })
    }

    /// Loaded items that are selected, in list order, regardless of filter.
    pub fn selected_items(&self) -> Vec<(ItemKey, T)> {
        let cache = self.index();
        self.list.with_items(|items| {
            cache
                .entries
                .iter()
                .zip(items)
                .filter(|(entry, _)| self.selection.is_selected(&entry.key))
                .map(|(entry, item)| (entry.key.clone(), item.clone()))
                .collect()
        })
    }

    pub fn selection(&self) -> &SelectionStore {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionStore {
        &mut self.selection
    }

    pub fn toggle(&mut self, key: ItemKey) -> Result<bool, ShelfError> {
        self.selection.toggle(key)
    }

    pub fn actions(&self) -> SelectionActions {
        self.selection.actions()
    }

    /// Drop selected identities that are no longer among the loaded items.
    pub fn prune_selection(&mut self) -> Result<usize, ShelfError> {
        let loaded: std::collections::HashSet<ItemKey> = self
            .index()
            .entries
            .iter()
            .map(|entry| entry.key.clone())
            .collect();
        self.selection.retain(|key| loaded.contains(key))
    }

    pub fn detail_mode(&self) -> bool {
        self.detail_mode
    }

    /// Flip and persist the detail-mode flag.
    pub fn toggle_detail_mode(&mut self) -> Result<bool, ShelfError> {
        self.detail_mode = !self.detail_mode;
        self.preferences
            .set_flag(self.options.detail_key, self.detail_mode)?;
        Ok(self.detail_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Direction, PromptEntry, PromptKind, ReferenceItem};
    use crate::pagination::{Page, PageRequest};
    use crate::store::{KeyValueStore, MemoryStore};
    use crate::test_support::prompt;
    use std::sync::Arc;

    /// In-memory source that honours server-side filters and records requests.
    struct StaticSource<T> {
        items: Mutex<Vec<T>>,
        requests: Mutex<Vec<PageRequest>>,
    }

    impl<T> StaticSource<T> {
        fn new(items: Vec<T>) -> Self {
            Self {
                items: Mutex::new(items),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn replace(&self, items: Vec<T>) {
            *self.items.lock().expect("items") = items;
        }

        fn requests(&self) -> Vec<PageRequest> {
            self.requests.lock().expect("requests").clone()
        }
    }

    impl<T: Clone + LibraryItem + Send + Sync> PageSource<T> for StaticSource<T> {
        async fn fetch_page(&self, request: &PageRequest) -> Result<Page<T>, ShelfError> {
            self.requests.lock().expect("requests").push(request.clone());
            let search = request.query.search.as_deref().map(str::to_lowercase);
            let matching: Vec<T> = self
                .items
                .lock()
                .expect("items")
                .iter()
                .filter(|item| {
                    let entry = ListItem::from_item(0, *item);
                    request
                        .query
                        .category
                        .as_deref()
                        .map_or(true, |category| entry.category == category)
                        && search
                            .as_deref()
                            .map_or(true, |needle| entry.searchable_text.contains(needle))
                })
                .cloned()
                .collect();
            let end = (request.offset + request.limit).min(matching.len());
            let start = request.offset.min(end);
            Ok(Page {
                items: matching[start..end].to_vec(),
                total: matching.len(),
                has_more: end < matching.len(),
            })
        }
    }

    fn library() -> Vec<PromptEntry> {
        vec![
            prompt("masterpiece", PromptKind::Quality, Direction::Positive, "best quality"),
            prompt("ink", PromptKind::Style, Direction::Unspecified, "ink wash painting"),
            prompt("blurry", PromptKind::Quality, Direction::Negative, "blurry, lowres"),
            prompt("watercolor", PromptKind::Style, Direction::Unspecified, "watercolor WASH"),
        ]
    }

    fn reference(name: &str, category: &str) -> ReferenceItem {
        ReferenceItem {
            file_name: format!("{}.png", name),
            category: category.to_string(),
            lora_name: name.to_string(),
            image_url: format!("/api/image?path={}/{}.png", category, name),
            width: 512,
            height: 512,
            steps: None,
            sampler: None,
            cfg_scale: None,
            seed: None,
            model: None,
            prompt: String::new(),
            negative_prompt: String::new(),
        }
    }

    fn prompt_view(
        items: Vec<PromptEntry>,
        store: Arc<MemoryStore>,
    ) -> LibraryView<PromptEntry, StaticSource<PromptEntry>> {
        LibraryView::new(
            ViewOptions::prompts(100),
            StaticSource::new(items),
            Preferences::new(store),
        )
    }

    fn names(items: &[VisibleItem<PromptEntry>]) -> Vec<&str> {
        items.iter().map(|visible| visible.item.name.as_str()).collect()
    }

    #[tokio::test]
    async fn client_filter_keeps_selection_across_changes() {
        let mut view = prompt_view(library(), Arc::new(MemoryStore::default()));
        view.load_more().await;
        view.toggle(ItemKey::Index(1)).expect("select ink");

        assert!(view.set_category("风格"));
        let styled = view.visible();
        assert_eq!(names(&styled), vec!["ink", "watercolor"]);
        assert!(styled[0].selected);
        assert!(!styled[1].selected);

        assert!(view.set_query("WASH"));
        assert_eq!(names(&view.visible()), vec!["ink", "watercolor"]);
        assert!(view.set_category(""));
        assert!(view.set_query("quality"));
        assert_eq!(names(&view.visible()), vec!["masterpiece"]);
        assert!(view.selection().is_selected(&ItemKey::Index(1)));
        assert!(!view.set_query("quality"));

        let selected = view.selected_items();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].1.name, "ink");
    }

    #[tokio::test]
    async fn exact_mode_without_query_shows_nothing() {
        let mut view = prompt_view(library(), Arc::new(MemoryStore::default()));
        view.load_more().await;
        view.set_mode(SearchMode::Exact);
        assert!(view.visible().is_empty());
        view.set_query("ink");
        assert_eq!(names(&view.visible()), vec!["ink"]);
    }

    #[tokio::test]
    async fn selection_and_detail_mode_are_restored_from_store() {
        let store = Arc::new(MemoryStore::default());
        {
            let mut view = prompt_view(library(), store.clone());
            view.toggle(ItemKey::Index(2)).expect("toggle");
            assert!(view.toggle_detail_mode().expect("detail"));
        }
        assert_eq!(
            store.get("promptDetailMode").expect("get").as_deref(),
            Some("true")
        );

        let view = prompt_view(library(), store);
        view.load_more().await;
        assert!(view.detail_mode());
        let visible = view.visible();
        assert!(visible[2].selected);
        assert!(view.actions().edit);
    }

    #[tokio::test]
    async fn server_filtered_view_restarts_session_on_filter_change() {
        let items = vec![
            reference("ink", "style"),
            reference("mecha", "char"),
            reference("ink-2", "style"),
        ];
        let mut view = LibraryView::new(
            ViewOptions::references(2),
            StaticSource::new(items),
            Preferences::new(Arc::new(MemoryStore::default())),
        );
        view.load_more().await;
        view.load_more().await;
        assert_eq!(view.visible().len(), 3);
        let ink_key = view.visible()[0].key.clone();
        view.toggle(ink_key.clone()).expect("toggle");

        view.set_category("style");
        view.set_query("INK");
        let outcome = view.load_more().await;
        assert!(matches!(
            outcome,
            LoadOutcome::Loaded {
                appended: 2,
                has_more: false
            }
        ));
        let visible = view.visible();
        assert_eq!(visible.len(), 2);
        assert!(visible[0].selected);
        assert_eq!(visible[0].key, ink_key);

        let last = view.list().source().requests().pop().expect("request");
        assert_eq!(last.offset, 0);
        assert_eq!(last.query.category.as_deref(), Some("style"));
        assert_eq!(last.query.search.as_deref(), Some("INK"));
    }

    #[tokio::test]
    async fn prune_drops_selection_beyond_shrunk_list() {
        let mut view = prompt_view(library(), Arc::new(MemoryStore::default()));
        view.load_more().await;
        view.toggle(ItemKey::Index(0)).expect("toggle");
        view.toggle(ItemKey::Index(3)).expect("toggle");

        view.list().source().replace(library().into_iter().take(2).collect());
        view.reload().await;
        assert_eq!(view.visible().len(), 2);
        assert_eq!(view.prune_selection().expect("prune"), 1);
        assert_eq!(view.selection().indices(), vec![0]);
    }
}
