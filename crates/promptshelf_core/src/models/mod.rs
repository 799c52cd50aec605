//! Library records exchanged with the backend and the list abstraction shared
//! by every list view.

pub mod lora;
pub mod prompt;
pub mod reference;

pub use lora::{LoraCatalog, LoraEntry, PreviewKind, RefreshReport};
pub use prompt::{Direction, PromptDraft, PromptEntry, PromptKind};
pub use reference::{CategoryList, ReferenceItem, ReferencePage};

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Read `null` as the type's default; the backend stores records verbatim.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Stable identity of an entry within one list.
///
/// Prompts and Loras are addressed by position (the backend mutates them by
/// index); reference items carry an explicit id. Serialized untagged so a
/// persisted selection reads as a plain JSON array of numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemKey {
    Index(usize),
    Id(String),
}

impl ItemKey {
    /// Positional index, when this key is one.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Index(index) => Some(*index),
            Self::Id(_) => None,
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "#{}", index),
            Self::Id(id) => f.write_str(id),
        }
    }
}

impl From<usize> for ItemKey {
    fn from(value: usize) -> Self {
        Self::Index(value)
    }
}

impl From<&str> for ItemKey {
    fn from(value: &str) -> Self {
        Self::Id(value.to_string())
    }
}

/// Behavior every library record provides to the list machinery.
pub trait LibraryItem {
    /// Identity of the record at `position` in its accumulated list.
    fn key(&self, position: usize) -> ItemKey {
        ItemKey::Index(position)
    }

    fn display_name(&self) -> &str;

    /// Category used by the category-equality filter.
    fn category(&self) -> &str;

    /// Raw text the free-text filter searches (lower-cased by [`ListItem`]).
    fn searchable_text(&self) -> String;
}

/// Precomputed filter view of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub key: ItemKey,
    pub display_name: String,
    pub category: String,
    pub searchable_text: String,
}

impl ListItem {
    /// Build the filter view of `item` located at `position`.
    pub fn from_item<T: LibraryItem>(position: usize, item: &T) -> Self {
        Self {
            key: item.key(position),
            display_name: item.display_name().to_string(),
            category: item.category().to_string(),
            searchable_text: item.searchable_text().to_lowercase(),
        }
    }
}
