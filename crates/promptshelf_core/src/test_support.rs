//! Shared test-only helpers for promptshelf_core.

use crate::models::{Direction, LoraEntry, PromptEntry, PromptKind};
use crate::store::RedbStore;
use std::sync::{Mutex, OnceLock};
use tempfile::TempDir;

/// Process-wide lock serializing tests that mutate environment variables.
pub(crate) fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

#[allow(unused_unsafe)]
fn write_env(key: &str, value: Option<&str>) {
    // SAFETY: every caller holds `env_lock()`.
    unsafe {
        match value {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }
}

/// Sets or clears an env var and restores the previous value on drop.
pub(crate) struct EnvGuard {
    key: String,
    previous: Option<String>,
}

impl EnvGuard {
    pub(crate) fn set(key: &str, value: &str) -> Self {
        Self::replace(key, Some(value))
    }

    pub(crate) fn remove(key: &str) -> Self {
        Self::replace(key, None)
    }

    fn replace(key: &str, value: Option<&str>) -> Self {
        let previous = std::env::var(key).ok();
        write_env(key, value);
        Self {
            key: key.to_string(),
            previous,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        write_env(self.key.as_str(), self.previous.as_deref());
    }
}

/// Opens a redb-backed store inside a fresh temp dir.
///
/// Keep the [`TempDir`] alive for the full test to preserve the backing file.
///
/// # Panics
/// Panics if temp-dir creation or store initialization fails.
pub(crate) fn setup_temp_store() -> (RedbStore, TempDir) {
    let temp_dir = TempDir::new().expect("temp dir");
    let store = RedbStore::open(temp_dir.path()).expect("open store");
    (store, temp_dir)
}

pub(crate) fn prompt(name: &str, kind: PromptKind, direction: Direction, text: &str) -> PromptEntry {
    PromptEntry {
        name: name.to_string(),
        direction,
        kind,
        note: None,
        text: text.to_string(),
    }
}

pub(crate) fn lora(name: &str, category: &str, triggers: &[&str]) -> LoraEntry {
    LoraEntry {
        name: name.to_string(),
        filename: format!("{}.safetensors", name.to_ascii_lowercase()),
        category: category.to_string(),
        base_model: None,
        trigger_words: triggers.iter().map(|word| word.to_string()).collect(),
        notes: None,
        preview_url: None,
    }
}
