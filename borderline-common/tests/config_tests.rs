//! Tests for configuration loading and root folder resolution
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate BORDERLINE_ROOT_FOLDER are marked with #[serial].

use borderline_common::config::{
    load_toml_config, resolve_root_folder, write_toml_config, TomlConfig, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_missing_toml_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config = load_toml_config(&temp_dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_malformed_toml_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "[inference\nmodel = ").unwrap();

    let err = load_toml_config(&path).unwrap_err();
    assert!(err.to_string().contains("Parse TOML failed"));
}

#[test]
fn test_write_then_load_preserves_api_key() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("borderline-ai.toml");

    let mut config = TomlConfig::default();
    config.inference.api_key = Some("sk-test".to_string());
    config.root_folder = Some("/srv/borderline".to_string());
    write_toml_config(&config, &path).unwrap();

    let loaded = load_toml_config(&path).unwrap();
    assert_eq!(loaded.inference.api_key.as_deref(), Some("sk-test"));
    assert_eq!(loaded.root_folder.as_deref(), Some("/srv/borderline"));
    assert!(!path.with_extension("toml.tmp").exists());
}

#[test]
#[serial]
fn test_cli_argument_wins() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let mut toml = TomlConfig::default();
    toml.root_folder = Some("/from/toml".to_string());

    let resolved = resolve_root_folder(Some(Path::new("/from/cli")), &toml);
    assert_eq!(resolved, PathBuf::from("/from/cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_env_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let mut toml = TomlConfig::default();
    toml.root_folder = Some("/from/toml".to_string());

    assert_eq!(resolve_root_folder(None, &toml), PathBuf::from("/from/env"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_toml_then_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let mut toml = TomlConfig::default();
    toml.root_folder = Some("/from/toml".to_string());
    assert_eq!(resolve_root_folder(None, &toml), PathBuf::from("/from/toml"));

    let fallback = resolve_root_folder(None, &TomlConfig::default());
    assert!(fallback.to_string_lossy().contains("borderline"));
}
