//! Configuration system tests
//!
//! Tests for config paths and loading/saving buffer thresholds.

use layerbuf::config::{DEFAULT_DIRECT_EDIT_LIMIT, DEFAULT_UNIFY_DENSITY};
use layerbuf::config_paths;
use layerbuf::{Anchor, Buffer, BufferConfig};

// ========================================================================
// Config Paths Tests
// ========================================================================

#[test]
fn test_config_dir_contains_layerbuf() {
    if let Some(dir) = config_paths::config_dir() {
        assert!(dir.ends_with("layerbuf"), "got: {}", dir.display());
    }
}

#[test]
fn test_config_file_ends_with_yaml() {
    if let Some(path) = config_paths::config_file() {
        assert!(path.to_string_lossy().ends_with("config.yaml"));
    }
}

#[test]
fn test_logs_dir_is_subdir_of_config() {
    if let (Some(config), Some(logs)) = (config_paths::config_dir(), config_paths::logs_dir()) {
        assert!(logs.starts_with(&config));
    }
}

// ========================================================================
// Buffer Config Tests
// ========================================================================

#[test]
fn test_default_config() {
    let config = BufferConfig::default();
    assert_eq!(config.direct_edit_limit, DEFAULT_DIRECT_EDIT_LIMIT);
    assert_eq!(config.unify_density, DEFAULT_UNIFY_DENSITY);
    assert!(config.auto_unify);
}

#[test]
fn test_config_serialize_deserialize() {
    let config = BufferConfig {
        direct_edit_limit: 512,
        unify_density: 4096,
        auto_unify: false,
    };
    let yaml = serde_yaml::to_string(&config).unwrap();
    let parsed: BufferConfig = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_partial_yaml_fills_defaults() {
    let parsed: BufferConfig = serde_yaml::from_str("auto_unify: false\n").unwrap();
    assert_eq!(parsed.direct_edit_limit, DEFAULT_DIRECT_EDIT_LIMIT);
    assert_eq!(parsed.unify_density, DEFAULT_UNIFY_DENSITY);
    assert!(!parsed.auto_unify);
}

#[test]
fn test_load_from_missing_file_returns_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = BufferConfig::load_from(&dir.path().join("nope.yaml"));
    assert_eq!(config, BufferConfig::default());
}

#[test]
fn test_load_from_invalid_yaml_returns_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "direct_edit_limit: [not, a, number]\n").unwrap();

    assert_eq!(BufferConfig::load_from(&path), BufferConfig::default());
}

#[test]
fn test_save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.yaml");
    let config = BufferConfig {
        direct_edit_limit: 0,
        unify_density: 1,
        auto_unify: false,
    };

    config.save_to(&path).unwrap();

    assert!(path.exists());
    assert_eq!(BufferConfig::load_from(&path), config);
}

#[test]
fn test_loaded_config_drives_edit_strategy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "direct_edit_limit: 0\nauto_unify: false\n").unwrap();

    let mut buffer = Buffer::with_config(b"abcdef".to_vec(), BufferConfig::load_from(&path));
    let mark = buffer.create(Anchor::Offset(3)).unwrap();
    buffer.insert(mark, b"-").unwrap();

    // No in-place splice allowed, so the insert split the only segment
    assert_eq!(buffer.stats().segments, 3);
    assert_eq!(buffer.to_vec(), b"abc-def");
}
