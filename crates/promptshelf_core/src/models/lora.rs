//! Lora library records.

use super::LibraryItem;
use serde::{Deserialize, Serialize};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm"];

/// One Lora adapter known to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoraEntry {
    pub name: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub filename: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub category: String,
    #[serde(default)]
    pub base_model: Option<String>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub trigger_words: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
}

/// How a Lora preview should be displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewKind {
    Image,
    Video,
}

impl LoraEntry {
    /// Classify the preview by the extension of its `path` query parameter.
    ///
    /// # Returns
    /// `None` when the entry has no preview.
    pub fn preview_kind(&self) -> Option<PreviewKind> {
        let url = self.preview_url.as_deref()?;
        let path = url
            .split_once('?')
            .map(|(_, query)| query)
            .unwrap_or("")
            .split('&')
            .find_map(|pair| pair.strip_prefix("path="))
            .unwrap_or("");
        let extension = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
        if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
            Some(PreviewKind::Video)
        } else {
            Some(PreviewKind::Image)
        }
    }

    /// Trigger words joined the way the generator emits them.
    pub fn trigger_text(&self) -> String {
        self.trigger_words.join(", ")
    }

    /// Generator tag label: the name plus the first trigger word, if any.
    pub fn tag_label(&self) -> String {
        match self.trigger_words.first() {
            Some(first) => format!("{} ({})", self.name, first),
            None => self.name.clone(),
        }
    }
}

impl LibraryItem for LoraEntry {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> &str {
        &self.category
    }

    fn searchable_text(&self) -> String {
        format!(
            "{}\n{}\n{}",
            self.name,
            self.filename,
            self.base_model.as_deref().unwrap_or("")
        )
    }
}

/// Response of the Lora list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoraCatalog {
    #[serde(default)]
    pub loras: Vec<LoraEntry>,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl LoraCatalog {
    /// Category preselected after a load: the first one, or "all" when none exist.
    pub fn default_category(&self) -> Option<&str> {
        self.categories.first().map(String::as_str)
    }
}

/// Response of the Lora metadata refresh endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshReport {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}
