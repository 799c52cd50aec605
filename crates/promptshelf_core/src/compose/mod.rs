//! Prompt composer: positive/negative tag lists rendered into prompt text.

pub mod llm;

pub use llm::LlmTemplates;

use crate::error::ShelfError;
use crate::models::{Direction, LoraEntry, PromptEntry};
use serde::Serialize;
use std::collections::BTreeSet;

/// Which prompt box a tag feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Positive,
    Negative,
}

/// Library entry a tag was created from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "index", rename_all = "lowercase")]
pub enum TagSource {
    Prompt(usize),
    Lora(usize),
}

/// One generator tag.
///
/// Text is captured when the tag is added, so later library edits do not
/// change an already composed prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub source: TagSource,
    pub name: String,
    pub label: String,
    pub text: String,
    /// Lora trigger words; empty for prompt tags.
    pub trigger_words: Vec<String>,
    pub enabled: bool,
}

impl Tag {
    fn from_prompt(index: usize, entry: &PromptEntry) -> Self {
        Self {
            source: TagSource::Prompt(index),
            name: entry.name.clone(),
            label: entry.name.clone(),
            text: entry.text.clone(),
            trigger_words: Vec::new(),
            enabled: true,
        }
    }

    fn from_lora(index: usize, entry: &LoraEntry) -> Self {
        Self {
            source: TagSource::Lora(index),
            name: entry.name.clone(),
            label: entry.tag_label(),
            text: entry.trigger_text(),
            trigger_words: entry.trigger_words.clone(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Composer {
    positive: Vec<Tag>,
    negative: Vec<Tag>,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tags(&self, side: Side) -> &[Tag] {
        match side {
            Side::Positive => &self.positive,
            Side::Negative => &self.negative,
        }
    }

    fn tags_mut(&mut self, side: Side) -> &mut Vec<Tag> {
        match side {
            Side::Positive => &mut self.positive,
            Side::Negative => &mut self.negative,
        }
    }

    fn push(&mut self, side: Side, tag: Tag) -> bool {
        let tags = self.tags_mut(side);
        if tags.iter().any(|existing| existing.source == tag.source) {
            return false;
        }
        tags.push(tag);
        true
    }

    /// Add prompts to the side matching their direction: negative prompts
    /// go to the negative list, everything else to the positive list.
    ///
    /// # Returns
    /// Number of tags added; sources already on their list are skipped.
    pub fn add_auto<'a>(
        &mut self,
        prompts: impl IntoIterator<Item = (usize, &'a PromptEntry)>,
    ) -> usize {
        prompts
            .into_iter()
            .filter(|(index, entry)| {
                let side = match entry.direction {
                    Direction::Negative => Side::Negative,
                    Direction::Positive | Direction::Unspecified => Side::Positive,
                };
                self.push(side, Tag::from_prompt(*index, entry))
            })
            .count()
    }

    /// Add prompts to `side` regardless of their direction.
    pub fn add_to<'a>(
        &mut self,
        side: Side,
        prompts: impl IntoIterator<Item = (usize, &'a PromptEntry)>,
    ) -> usize {
        prompts
            .into_iter()
            .filter(|(index, entry)| self.push(side, Tag::from_prompt(*index, entry)))
            .count()
    }

    /// Add Loras to the positive list; each contributes its trigger words.
    pub fn add_loras<'a>(&mut self, loras: impl IntoIterator<Item = (usize, &'a LoraEntry)>) -> usize {
        loras
            .into_iter()
            .filter(|(index, entry)| self.push(Side::Positive, Tag::from_lora(*index, entry)))
            .count()
    }

    /// Enable or disable a tag.
    ///
    /// # Errors
    /// Returns [`ShelfError::NotFound`] when `source` is not on `side`.
    pub fn set_enabled(
        &mut self,
        side: Side,
        source: TagSource,
        enabled: bool,
    ) -> Result<(), ShelfError> {
        let tag = self
            .tags_mut(side)
            .iter_mut()
            .find(|tag| tag.source == source)
            .ok_or(ShelfError::NotFound)?;
        tag.enabled = enabled;
        Ok(())
    }

    /// Flip a tag's enabled flag.
    ///
    /// # Returns
    /// The new flag.
    pub fn toggle(&mut self, side: Side, source: TagSource) -> Result<bool, ShelfError> {
        let tag = self
            .tags_mut(side)
            .iter_mut()
            .find(|tag| tag.source == source)
            .ok_or(ShelfError::NotFound)?;
        tag.enabled = !tag.enabled;
        Ok(tag.enabled)
    }

    pub fn remove(&mut self, side: Side, source: TagSource) -> bool {
        let tags = self.tags_mut(side);
        let before = tags.len();
        tags.retain(|tag| tag.source != source);
        tags.len() != before
    }

    pub fn clear(&mut self) {
        self.positive.clear();
        self.negative.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.positive.is_empty() && self.negative.is_empty()
    }

    /// Render one side: enabled, non-empty contributions in insertion order,
    /// one per line, each line ending with a comma.
    pub fn render(&self, side: Side) -> String {
        let parts: Vec<&str> = self
            .tags(side)
            .iter()
            .filter(|tag| tag.enabled)
            .map(|tag| tag.text.trim())
            .filter(|text| !text.is_empty())
            .collect();
        if parts.is_empty() {
            return String::new();
        }
        format!("{},", parts.join(",\n"))
    }

    /// Prompt indices present on either side, enabled or not.
    pub fn prompt_indices(&self) -> BTreeSet<usize> {
        self.positive
            .iter()
            .chain(&self.negative)
            .filter_map(|tag| match tag.source {
                TagSource::Prompt(index) => Some(index),
                TagSource::Lora(_) => None,
            })
            .collect()
    }

    /// Enabled Lora tags on the positive side.
    pub fn enabled_loras(&self) -> impl Iterator<Item = &Tag> + '_ {
        self.positive
            .iter()
            .filter(|tag| tag.enabled && matches!(tag.source, TagSource::Lora(_)))
    }
}
