//! Typed access to persisted UI preferences.
//!
//! Values are stored as plain strings (`"dark"`, `"true"`, `"420"`) so the
//! store stays readable with any key-value tool.

use crate::config::parse_env_flag;
use crate::constants::{DEFAULT_PANEL_WIDTH, MAX_PANEL_WIDTH, MIN_PANEL_WIDTH};
use crate::error::ShelfError;
use crate::store::SharedStore;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Every documented preference key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreferenceKey {
    Theme,
    ReaderTheme,
    Language,
    ActiveTab,
    PanelWidth,
    PromptDetailMode,
    LoraDetailMode,
    ReaderDetailMode,
    LoraCategory,
}

impl PreferenceKey {
    pub const ALL: [Self; 9] = [
        Self::Theme,
        Self::ReaderTheme,
        Self::Language,
        Self::ActiveTab,
        Self::PanelWidth,
        Self::PromptDetailMode,
        Self::LoraDetailMode,
        Self::ReaderDetailMode,
        Self::LoraCategory,
    ];

    /// Storage key.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Theme => "promptTheme",
            Self::ReaderTheme => "promptReaderTheme",
            Self::Language => "promptLang",
            Self::ActiveTab => "promptActiveTab",
            Self::PanelWidth => "promptPanelWidth",
            Self::PromptDetailMode => "promptDetailMode",
            Self::LoraDetailMode => "loraDetailMode",
            Self::ReaderDetailMode => "promptReaderDetailMode",
            Self::LoraCategory => "loraCategory",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == value.trim())
    }
}

impl fmt::Display for PreferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Zh,
    En,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Zh => "zh",
            Self::En => "en",
        }
    }

    /// Parse a stored value (`zh` or `en`).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "zh" => Some(Self::Zh),
            "en" => Some(Self::En),
            _ => None,
        }
    }

    /// Map a host locale setting such as `zh_CN` or `en-US`.
    pub fn from_host(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "zh" | "zh-cn" | "zh-hans" => Some(Self::Zh),
            "en" | "en-us" => Some(Self::En),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveTab {
    #[default]
    Prompt,
    Lora,
}

impl ActiveTab {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prompt => "prompt",
            Self::Lora => "lora",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "prompt" => Some(Self::Prompt),
            "lora" => Some(Self::Lora),
            _ => None,
        }
    }
}

/// Resolved value of every preference, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreferenceSnapshot {
    pub theme: Theme,
    pub reader_theme: Theme,
    pub language: Language,
    pub active_tab: ActiveTab,
    pub panel_width: u32,
    pub prompt_detail_mode: bool,
    pub lora_detail_mode: bool,
    pub reader_detail_mode: bool,
    pub lora_category: String,
}

/// Preference accessor over a shared key-value store.
#[derive(Clone)]
pub struct Preferences {
    store: SharedStore,
}

impl fmt::Debug for Preferences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Preferences").finish_non_exhaustive()
    }
}

impl Preferences {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    fn read<T>(&self, key: PreferenceKey, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
        let raw = match self.store.get(key.as_str()) {
            Ok(raw) => raw?,
            Err(err) => {
                debug!(key = %key, error = %err, "preference unreadable; using default");
                return None;
            }
        };
        let parsed = parse(&raw);
        if parsed.is_none() {
            debug!(key = %key, value = %raw, "malformed preference; using default");
        }
        parsed
    }

    fn write(&self, key: PreferenceKey, value: &str) -> Result<(), ShelfError> {
        self.store.set(key.as_str(), value)
    }

    pub fn theme(&self) -> Theme {
        self.read(PreferenceKey::Theme, Theme::parse)
            .unwrap_or_default()
    }

    pub fn set_theme(&self, theme: Theme) -> Result<(), ShelfError> {
        self.write(PreferenceKey::Theme, theme.as_str())
    }

    /// Theme of the reference reader, dark unless stored otherwise.
    pub fn reader_theme(&self) -> Theme {
        self.read(PreferenceKey::ReaderTheme, Theme::parse)
            .unwrap_or(Theme::Dark)
    }

    pub fn set_reader_theme(&self, theme: Theme) -> Result<(), ShelfError> {
        self.write(PreferenceKey::ReaderTheme, theme.as_str())
    }

    /// Flip the library theme, or the reader theme when `reader` is set.
    ///
    /// # Returns
    /// The theme now stored.
    pub fn toggle_theme(&self, reader: bool) -> Result<Theme, ShelfError> {
        if reader {
            let theme = self.reader_theme().toggled();
            self.set_reader_theme(theme)?;
            Ok(theme)
        } else {
            let theme = self.theme().toggled();
            self.set_theme(theme)?;
            Ok(theme)
        }
    }

    /// Stored language, without host resolution.
    pub fn stored_language(&self) -> Option<Language> {
        self.read(PreferenceKey::Language, Language::parse)
    }

    /// Effective language: a recognised host language wins, then the stored
    /// choice, then Chinese.
    pub fn language(&self, host: Option<&str>) -> Language {
        host.and_then(Language::from_host)
            .or_else(|| self.stored_language())
            .unwrap_or_default()
    }

    pub fn set_language(&self, language: Language) -> Result<(), ShelfError> {
        self.write(PreferenceKey::Language, language.as_str())
    }

    pub fn active_tab(&self) -> ActiveTab {
        self.read(PreferenceKey::ActiveTab, ActiveTab::parse)
            .unwrap_or_default()
    }

    pub fn set_active_tab(&self, tab: ActiveTab) -> Result<(), ShelfError> {
        self.write(PreferenceKey::ActiveTab, tab.as_str())
    }

    /// Panel width in pixels, clamped to the supported range.
    pub fn panel_width(&self) -> u32 {
        self.read(PreferenceKey::PanelWidth, |raw| raw.trim().parse::<u32>().ok())
            .map(clamp_panel_width)
            .unwrap_or(DEFAULT_PANEL_WIDTH)
    }

    /// Store `width` after clamping it.
    ///
    /// # Returns
    /// The width actually stored.
    pub fn set_panel_width(&self, width: u32) -> Result<u32, ShelfError> {
        let width = clamp_panel_width(width);
        self.write(PreferenceKey::PanelWidth, &width.to_string())?;
        Ok(width)
    }

    /// Read a boolean preference such as a detail-mode flag.
    pub fn flag(&self, key: PreferenceKey) -> bool {
        self.read(key, parse_env_flag).unwrap_or(false)
    }

    pub fn set_flag(&self, key: PreferenceKey, enabled: bool) -> Result<(), ShelfError> {
        self.write(key, if enabled { "true" } else { "false" })
    }

    /// Last Lora category chosen; an empty string means all categories.
    pub fn lora_category(&self) -> String {
        self.stored_lora_category().unwrap_or_default()
    }

    /// Stored Lora category, or `None` when no choice was ever saved.
    pub fn stored_lora_category(&self) -> Option<String> {
        self.read(PreferenceKey::LoraCategory, |raw| Some(raw.to_string()))
    }

    pub fn set_lora_category(&self, category: &str) -> Result<(), ShelfError> {
        self.write(PreferenceKey::LoraCategory, category.trim())
    }

    /// Validate and store a textual value for `key`.
    ///
    /// # Errors
    /// Returns [`ShelfError::InvalidInput`] when `value` is not valid for `key`.
    pub fn set_from_str(&self, key: PreferenceKey, value: &str) -> Result<(), ShelfError> {
        let invalid = || ShelfError::InvalidInput(format!("invalid value for {}: {:?}", key, value));
        match key {
            PreferenceKey::Theme => self.set_theme(Theme::parse(value).ok_or_else(invalid)?),
            PreferenceKey::ReaderTheme => {
                self.set_reader_theme(Theme::parse(value).ok_or_else(invalid)?)
            }
            PreferenceKey::Language => {
                let language = Language::parse(value)
                    .or_else(|| Language::from_host(value))
                    .ok_or_else(invalid)?;
                self.set_language(language)
            }
            PreferenceKey::ActiveTab => {
                self.set_active_tab(ActiveTab::parse(value).ok_or_else(invalid)?)
            }
            PreferenceKey::PanelWidth => {
                let width = value.trim().parse::<u32>().map_err(|_| invalid())?;
                self.set_panel_width(width).map(|_| ())
            }
            PreferenceKey::PromptDetailMode
            | PreferenceKey::LoraDetailMode
            | PreferenceKey::ReaderDetailMode => {
                self.set_flag(key, parse_env_flag(value).ok_or_else(invalid)?)
            }
            PreferenceKey::LoraCategory => self.set_lora_category(value),
        }
    }

    pub fn snapshot(&self, host_language: Option<&str>) -> PreferenceSnapshot {
        PreferenceSnapshot {
            theme: self.theme(),
            reader_theme: self.reader_theme(),
            language: self.language(host_language),
            active_tab: self.active_tab(),
            panel_width: self.panel_width(),
            prompt_detail_mode: self.flag(PreferenceKey::PromptDetailMode),
            lora_detail_mode: self.flag(PreferenceKey::LoraDetailMode),
            reader_detail_mode: self.flag(PreferenceKey::ReaderDetailMode),
            lora_category: self.lora_category(),
        }
    }
}

fn clamp_panel_width(width: u32) -> u32 {
    width.clamp(MIN_PANEL_WIDTH, MAX_PANEL_WIDTH)
}
