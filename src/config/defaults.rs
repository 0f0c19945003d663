//! Default configuration values
//!
//! All constants used throughout the config module are defined here.

/// Location of the config file itself
pub const DEFAULT_CONFIG_PATH: &str = "~/.cuekit/config.json";

/// Persisted state document
pub const DEFAULT_STORE_PATH: &str = "~/.cuekit/state.json";

/// Window in which bursts of filesystem events collapse into one reload
pub const DEFAULT_WATCH_DEBOUNCE_MS: u64 = 200;

/// Used when neither RUST_LOG nor the config sets a filter
pub const DEFAULT_LOG_FILTER: &str = "info";
