// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use qrscan::CameraFacing;
use qrscan::Config;
use qrscan::constants::scanner;
use std::path::PathBuf;

fn scratch_file(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("qrscan-config-{}", uuid::Uuid::new_v4()))
        .join(name)
}

#[test]
fn test_config_default() {
    let config = Config::default();

    // Check sensible defaults
    assert_eq!(config.default_facing, CameraFacing::Back, "Scanning should start on the back camera");
    assert!(!config.torch_on_start, "Torch should be off by default");
    assert_eq!(config.detector_max_dimension, scanner::DEFAULT_MAX_DIMENSION);
}

#[test]
fn test_config_save_and_load() {
    let path = scratch_file("config.json");
    let config = Config {
        default_facing: CameraFacing::Front,
        torch_on_start: true,
        generator_size: 300,
        ..Config::default()
    };

    config.save_to(&path).unwrap();
    let loaded = Config::load_from(&path).unwrap();

    assert_eq!(loaded, config);
    std::fs::remove_dir_all(path.parent().unwrap()).ok();
}

#[test]
fn test_config_missing_file_uses_defaults() {
    let path = scratch_file("absent.json");
    assert_eq!(Config::load_or_default(&path), Config::default());
    assert!(Config::load_from(&path).is_err());
}

#[test]
fn test_config_malformed_file_uses_defaults() {
    let path = scratch_file("broken.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "{ not json").unwrap();

    assert_eq!(Config::load_or_default(&path), Config::default());
    let err = Config::load_from(&path).unwrap_err();
    assert!(err.to_string().starts_with("Configuration error"));
    std::fs::remove_dir_all(path.parent().unwrap()).ok();
}

#[test]
fn test_config_ignores_unknown_fields() {
    let config: Config = serde_json::from_str(r#"{"torch_on_start":true,"theme":"dark"}"#).unwrap();
    assert!(config.torch_on_start);
    assert_eq!(config.vibrate_ms, scanner::DEFAULT_VIBRATE_MS);
}
