//! Configuration type definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::defaults::*;

/// Host configuration read from config.json
///
/// Every field is optional; the `get_*` accessors apply defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Path of the state document, `~` is expanded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch_debounce_ms: Option<u64>,
    /// `tracing` filter directive, e.g. "info,cue_expander=debug"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

impl Config {
    /// Returns the state document path with `~` expanded
    pub fn get_store_path(&self) -> PathBuf {
        let raw = self.store_path.as_deref().unwrap_or(DEFAULT_STORE_PATH);
        PathBuf::from(shellexpand::tilde(raw).as_ref())
    }

    pub fn get_watch_debounce(&self) -> Duration {
        Duration::from_millis(self.watch_debounce_ms.unwrap_or(DEFAULT_WATCH_DEBOUNCE_MS))
    }

    /// Returns the configured log filter, or None to fall back to RUST_LOG / the default
    pub fn get_log_filter(&self) -> Option<&str> {
        self.log_filter.as_deref().filter(|f| !f.trim().is_empty())
    }
}
