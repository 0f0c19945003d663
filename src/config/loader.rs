//! Configuration loading from file system

use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use super::defaults::DEFAULT_CONFIG_PATH;
use super::types::Config;

/// Load configuration from ~/.cuekit/config.json
///
/// Returns Config::default() if the file is missing or invalid.
pub fn load_config() -> Config {
    let config_path = PathBuf::from(shellexpand::tilde(DEFAULT_CONFIG_PATH).as_ref());
    load_config_from(&config_path)
}

/// Load configuration from an explicit path
#[instrument(name = "load_config")]
pub fn load_config_from(config_path: &Path) -> Config {
    if !config_path.exists() {
        info!(path = %config_path.display(), "Config file not found, using defaults");
        return Config::default();
    }

    let contents = match std::fs::read_to_string(config_path) {
        Ok(contents) => contents,
        Err(e) => {
            warn!(error = %e, path = %config_path.display(), "Failed to read config, using defaults");
            return Config::default();
        }
    };

    match serde_json::from_str::<Config>(&contents) {
        Ok(config) => {
            info!(path = %config_path.display(), "Successfully loaded config");
            config
        }
        Err(e) => {
            warn!(
                error = %e,
                path = %config_path.display(),
                "Failed to parse config JSON, using defaults"
            );
            Config::default()
        }
    }
}
