//! Core library for promptshelf (list state, storage, models, composition).

/// Prompt composer and LLM request builder.
pub mod compose;
/// Configuration loading and defaults.
pub mod config;
/// Shared constants.
pub mod constants;
/// Application error types (storage/wire/domain).
pub mod error;
/// Category and free-text filtering.
pub mod filter;
/// Records exchanged with the backend.
pub mod models;
/// Incremental page loading.
pub mod pagination;
/// Typed UI preferences.
pub mod preferences;
/// Persisted multi-select state.
pub mod selection;
/// Key-value storage backends.
pub mod store;
/// Generic list view.
pub mod view;

#[cfg(test)]
mod test_support;

pub use compose::{Composer, LlmTemplates, Side};
pub use config::Config;
pub use error::ShelfError;
pub use filter::{FilterSpec, SearchMode};
pub use pagination::{ListQuery, LoadOutcome, Page, PageRequest, PageSource, PaginatedList};
pub use preferences::Preferences;
pub use selection::SelectionStore;
pub use store::{KeyValueStore, MemoryStore, RedbStore, SharedStore};
pub use view::{LibraryView, ViewOptions};
