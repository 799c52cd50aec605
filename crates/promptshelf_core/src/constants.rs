//! Shared constants used across promptshelf crates.

/// Default base URL of the prompt/Lora library backend (the host UI server).
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8188";

/// Default base URL of the reference image reader service.
pub const DEFAULT_READER_URL: &str = "http://127.0.0.1:8765";

/// Fixed page size used by incremental list loading.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default width of the library panel, in pixels.
pub const DEFAULT_PANEL_WIDTH: u32 = 420;
/// Narrowest panel width accepted from storage.
pub const MIN_PANEL_WIDTH: u32 = 240;
/// Widest panel width accepted from storage.
pub const MAX_PANEL_WIDTH: u32 = 1600;

/// Name of the redb file inside the configured store directory.
pub const STORE_FILE_NAME: &str = "prefs.redb";
