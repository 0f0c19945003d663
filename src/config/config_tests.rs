use super::*;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.store_path, None);
    assert_eq!(config.watch_debounce_ms, None);
    assert_eq!(config.get_log_filter(), None);
    assert_eq!(
        config.get_watch_debounce(),
        Duration::from_millis(DEFAULT_WATCH_DEBOUNCE_MS)
    );
}

#[test]
fn test_store_path_default_is_tilde_expanded() {
    let path = Config::default().get_store_path();
    assert!(!path.to_string_lossy().starts_with('~'));
    assert!(path.ends_with(".cuekit/state.json"));
}

#[test]
fn test_store_path_absolute_unchanged() {
    let config = Config {
        store_path: Some("/var/lib/cues/state.json".to_string()),
        ..Default::default()
    };
    assert_eq!(
        config.get_store_path(),
        PathBuf::from("/var/lib/cues/state.json")
    );
}

#[test]
fn test_config_camel_case_fields() {
    let json = r#"{"storePath":"/tmp/s.json","watchDebounceMs":50,"logFilter":"debug"}"#;
    let config: Config = serde_json::from_str(json).unwrap();
    assert_eq!(config.store_path.as_deref(), Some("/tmp/s.json"));
    assert_eq!(config.get_watch_debounce(), Duration::from_millis(50));
    assert_eq!(config.get_log_filter(), Some("debug"));
}

#[test]
fn test_blank_log_filter_ignored() {
    let config = Config {
        log_filter: Some("  ".to_string()),
        ..Default::default()
    };
    assert_eq!(config.get_log_filter(), None);
}

#[test]
fn test_load_config_from_missing_file() {
    let dir = tempdir().unwrap();
    let config = load_config_from(&dir.path().join("config.json"));
    assert_eq!(config, Config::default());
}

#[test]
fn test_load_config_from_invalid_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert_eq!(load_config_from(&path), Config::default());
}

#[test]
fn test_load_config_from_partial_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"watchDebounceMs":1000}"#).unwrap();

    let config = load_config_from(&path);
    assert_eq!(config.watch_debounce_ms, Some(1000));
    assert_eq!(config.store_path, None);
}
