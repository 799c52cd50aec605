//! Configuration loading from environment variables.

use crate::constants::{
    DEFAULT_PAGE_SIZE, DEFAULT_READER_URL, DEFAULT_SERVER_URL, DEFAULT_TIMEOUT_SECS,
};
use std::env;
use std::path::PathBuf;

/// Backend base URL.
pub const SERVER_ENV: &str = "PSHELF_SERVER";
/// Reference reader base URL.
pub const READER_ENV: &str = "PSHELF_READER";
/// Directory holding the preference store.
pub const STORE_PATH_ENV: &str = "PSHELF_STORE_PATH";
/// Page size for incremental loading.
pub const PAGE_SIZE_ENV: &str = "PSHELF_PAGE_SIZE";
/// Request timeout in seconds.
pub const TIMEOUT_ENV: &str = "PSHELF_TIMEOUT_SECS";
/// When set, preferences and selections live in memory only.
pub const READ_ONLY_ENV: &str = "PSHELF_READ_ONLY";

/// Runtime configuration for promptshelf front ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub server_url: String,
    pub reader_url: String,
    pub store_path: PathBuf,
    pub page_size: usize,
    pub timeout_secs: u64,
    pub read_only: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            reader_url: DEFAULT_READER_URL.to_string(),
            store_path: default_store_path(),
            page_size: DEFAULT_PAGE_SIZE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            read_only: false,
        }
    }
}

/// Expand tilde (~) in paths to the user's home directory
fn expand_tilde(path: String) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = resolve_home_dir() {
            return home.join(rest).to_string_lossy().to_string();
        }
    }
    path
}

fn resolve_home_dir() -> Option<PathBuf> {
    for key in ["HOME", "USERPROFILE"] {
        if let Ok(home) = env::var(key) {
            if !home.trim().is_empty() {
                return Some(PathBuf::from(home));
            }
        }
    }
    env::current_dir().ok()
}

fn default_store_path() -> PathBuf {
    resolve_home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cache")
        .join("promptshelf")
        .join("store")
}

/// Parse a boolean-like environment flag value.
///
/// # Supported Values
/// - Truthy: `1`, `true`, `yes`, `on`
/// - Falsy: `0`, `false`, `no`, `off`, empty string
///
/// Matching is case-insensitive and ignores surrounding whitespace.
///
/// # Returns
/// `Some(bool)` when the value is recognized, otherwise `None`.
pub fn parse_env_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Read a boolean flag from the environment.
///
/// Missing or unrecognized values are treated as `false`.
pub fn env_flag_enabled(name: &str) -> bool {
    env::var(name)
        .ok()
        .and_then(|value| parse_env_flag(&value))
        .unwrap_or(false)
}

fn non_blank_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Returns
    /// A populated [`Config`] with defaults applied when env vars are missing
    /// or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_url: non_blank_env(SERVER_ENV).unwrap_or(defaults.server_url),
            reader_url: non_blank_env(READER_ENV).unwrap_or(defaults.reader_url),
            store_path: non_blank_env(STORE_PATH_ENV)
                .map(expand_tilde)
                .map(PathBuf::from)
                .unwrap_or(defaults.store_path),
            page_size: non_blank_env(PAGE_SIZE_ENV)
                .and_then(|value| value.parse::<usize>().ok())
                .filter(|size| *size > 0)
                .unwrap_or(defaults.page_size),
            timeout_secs: non_blank_env(TIMEOUT_ENV)
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.timeout_secs),
            read_only: env_flag_enabled(READ_ONLY_ENV),
        }
    }
}
