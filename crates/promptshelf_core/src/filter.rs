//! Category and free-text filtering over precomputed list items.

use crate::models::ListItem;
use serde::{Deserialize, Serialize};

/// How the free-text query is matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Substring match; an empty query matches everything.
    #[default]
    Fuzzy,
    /// Substring match that requires a non-empty query.
    Exact,
}

/// Filter input as the user typed it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterSpec {
    /// Empty means every category.
    pub category: String,
    pub query: String,
    pub mode: SearchMode,
}

impl FilterSpec {
    pub fn new(category: impl Into<String>, query: impl Into<String>, mode: SearchMode) -> Self {
        Self {
            category: category.into(),
            query: query.into(),
            mode,
        }
    }

    /// Compile into a predicate with the query normalized once.
    pub fn compile(&self) -> ItemFilter {
        ItemFilter {
            category: Some(self.category.trim())
                .filter(|category| !category.is_empty())
                .map(str::to_string),
            needle: self.query.trim().to_lowercase(),
            mode: self.mode,
        }
    }
}

/// Compiled category-equality and substring predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFilter {
    category: Option<String>,
    needle: String,
    mode: SearchMode,
}

impl ItemFilter {
    pub fn matches_category(&self, item: &ListItem) -> bool {
        self.category
            .as_deref()
            .map_or(true, |category| item.category == category)
    }

    pub fn matches_text(&self, item: &ListItem) -> bool {
        match self.mode {
            SearchMode::Fuzzy => item.searchable_text.contains(self.needle.as_str()),
            SearchMode::Exact => {
                !self.needle.is_empty() && item.searchable_text.contains(self.needle.as_str())
            }
        }
    }

    pub fn matches(&self, item: &ListItem) -> bool {
        self.matches_category(item) && self.matches_text(item)
    }

    /// Filtered items, in list order, borrowed from `items`.
    pub fn apply<'a>(&'a self, items: &'a [ListItem]) -> impl Iterator<Item = &'a ListItem> + 'a {
        items.iter().filter(move |item| self.matches(item))
    }
}
