//! Reference image records served by the reader service.

use super::{ItemKey, LibraryItem};
use serde::{Deserialize, Serialize};

/// Example image with the generation parameters extracted from its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceItem {
    pub file_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub lora_name: String,
    pub image_url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub steps: Option<u32>,
    #[serde(default)]
    pub sampler: Option<String>,
    #[serde(default)]
    pub cfg_scale: Option<f64>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub negative_prompt: String,
}

impl ReferenceItem {
    /// `category · WxH` summary line shown under the card title.
    pub fn summary(&self) -> String {
        format!("{} · {}x{}", self.category, self.width, self.height)
    }
}

impl LibraryItem for ReferenceItem {
    fn key(&self, _position: usize) -> ItemKey {
        ItemKey::Id(self.image_url.clone())
    }

    fn display_name(&self) -> &str {
        &self.lora_name
    }

    fn category(&self) -> &str {
        &self.category
    }

    fn searchable_text(&self) -> String {
        format!("{}\n{}\n{}", self.lora_name, self.file_name, self.prompt)
    }
}

/// One slice of the reference listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferencePage {
    #[serde(default)]
    pub references: Vec<ReferenceItem>,
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Response of the reader's category endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryList {
    #[serde(default)]
    pub categories: Vec<String>,
}
