//! Configuration module - host settings for the expander
//!
//! This module provides functionality for:
//! - Loading configuration from ~/.cuekit/config.json
//! - Default values for all settings
//! - Type definitions for config structures
//!
//! Settings that travel with the state document (auto-expand, trigger
//! prefix, case sensitivity) live in the snapshot, not here.
//!
//! # Module Structure
//!
//! - `defaults` - All default constant values
//! - `types` - Configuration struct definitions
//! - `loader` - File system loading and parsing

mod defaults;
mod loader;
mod types;

pub use defaults::{
    DEFAULT_CONFIG_PATH, DEFAULT_LOG_FILTER, DEFAULT_STORE_PATH, DEFAULT_WATCH_DEBOUNCE_MS,
};
pub use loader::{load_config, load_config_from};
pub use types::Config;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
