//! Prompt library records.

use super::LibraryItem;
use crate::error::ShelfError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Which generator panel a prompt belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "无")]
    Unspecified,
    #[serde(rename = "正向")]
    Positive,
    #[serde(rename = "反向")]
    Negative,
}

impl Direction {
    /// Wire label stored by the backend.
    pub fn label(self) -> &'static str {
        match self {
            Self::Unspecified => "无",
            Self::Positive => "正向",
            Self::Negative => "反向",
        }
    }

    /// Parse a wire label or its English alias.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "无" | "none" => Some(Self::Unspecified),
            "正向" | "positive" | "pos" => Some(Self::Positive),
            "反向" | "negative" | "neg" => Some(Self::Negative),
            _ => None,
        }
    }
}

/// Blank, null and unrecognised labels read as [`Direction::Unspecified`].
impl<'de> Deserialize<'de> for Direction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = Option::<String>::deserialize(deserializer)?;
        Ok(label
            .as_deref()
            .and_then(Self::parse)
            .unwrap_or_default())
    }
}

/// Prompt category. Labels outside the built-in set are kept verbatim in
/// [`PromptKind::Custom`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum PromptKind {
    Quality,
    Style,
    Texture,
    Environment,
    Action,
    Expression,
    Clothing,
    Composition,
    #[default]
    Other,
    Custom(String),
}

impl PromptKind {
    pub const ALL: [Self; 9] = [
        Self::Quality,
        Self::Style,
        Self::Texture,
        Self::Environment,
        Self::Action,
        Self::Expression,
        Self::Clothing,
        Self::Composition,
        Self::Other,
    ];

    /// Wire label stored by the backend; also the category filter value.
    pub fn label(&self) -> &str {
        match self {
            Self::Quality => "质量",
            Self::Style => "风格",
            Self::Texture => "质感",
            Self::Environment => "环境",
            Self::Action => "动作",
            Self::Expression => "表情",
            Self::Clothing => "服装",
            Self::Composition => "构图",
            Self::Other => "其它",
            Self::Custom(label) => label.as_str(),
        }
    }

    fn english(&self) -> &str {
        match self {
            Self::Quality => "quality",
            Self::Style => "style",
            Self::Texture => "texture",
            Self::Environment => "environment",
            Self::Action => "action",
            Self::Expression => "expression",
            Self::Clothing => "clothing",
            Self::Composition => "composition",
            Self::Other => "other",
            Self::Custom(label) => label.as_str(),
        }
    }

    /// Parse a built-in wire label or its English alias.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.label() == value || kind.english().eq_ignore_ascii_case(value))
    }

    /// Decode a stored label: blank means [`PromptKind::Other`], unknown
    /// labels become [`PromptKind::Custom`].
    pub fn from_label(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() {
            return Self::Other;
        }
        Self::parse(value).unwrap_or_else(|| Self::Custom(value.to_string()))
    }
}

impl Serialize for PromptKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for PromptKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = Option::<String>::deserialize(deserializer)?;
        Ok(label.as_deref().map(Self::from_label).unwrap_or_default())
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One stored prompt snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptEntry {
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub name: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(rename = "type", default)]
    pub kind: PromptKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub text: String,
}

impl LibraryItem for PromptEntry {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> &str {
        self.kind.label()
    }

    fn searchable_text(&self) -> String {
        format!(
            "{} {} {}",
            self.name,
            self.note.as_deref().unwrap_or(""),
            self.text
        )
    }
}

/// Unvalidated form input for adding or editing a prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptDraft {
    pub name: String,
    pub direction: Direction,
    pub kind: PromptKind,
    pub note: String,
    pub text: String,
}

impl PromptDraft {
    /// Trim the draft and turn it into an entry.
    ///
    /// # Errors
    /// Returns [`ShelfError::InvalidInput`] when the name or text is blank.
    pub fn validate(self) -> Result<PromptEntry, ShelfError> {
        let name = self.name.trim();
        let text = self.text.trim();
        if name.is_empty() || text.is_empty() {
            return Err(ShelfError::InvalidInput(
                "prompt name and text are required".to_string(),
            ));
        }
        let note = self.note.trim();
        Ok(PromptEntry {
            name: name.to_string(),
            direction: self.direction,
            kind: self.kind,
            note: (!note.is_empty()).then(|| note.to_string()),
            text: text.to_string(),
        })
    }
}

impl From<&PromptEntry> for PromptDraft {
    fn from(entry: &PromptEntry) -> Self {
        Self {
            name: entry.name.clone(),
            direction: entry.direction,
            kind: entry.kind.clone(),
            note: entry.note.clone().unwrap_or_default(),
            text: entry.text.clone(),
        }
    }
}
