//! Tests for TOML config loading, creation, and path resolution.

use super::*;
use std::path::Path;

#[test]
fn load_from_nonexistent_returns_file_not_found() {
    let result = load_from_path(Path::new("/tmp/nonexistent_insforge_config.toml"));
    let err = result.unwrap_err();
    assert!(matches!(err, insforge_common::ConfigError::FileNotFound(_)));
}

#[test]
fn load_valid_partial_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
base_url = "https://demo.insforge.app"

[realtime]
ack_timeout_ms = 2500
reconnect = false
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.base_url, "https://demo.insforge.app");
    assert_eq!(config.realtime.ack_timeout_ms, 2500);
    assert!(!config.realtime.reconnect);
    // Defaults preserved
    assert_eq!(config.realtime.max_reconnect_delay_secs, 30);
    assert!(config.anon_key.is_none());
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "this is not valid toml {{{").unwrap();

    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, insforge_common::ConfigError::ParseError(_)));
}

#[test]
fn load_config_with_invalid_values_is_returned_as_parsed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[realtime]\nack_timeout_ms = 0\n").unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.realtime.ack_timeout_ms, 0);
}

#[test]
fn create_and_load_default_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("insforge").join("config.toml");

    create_default_config(&path).unwrap();
    assert!(path.exists());

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.base_url, "http://localhost:7130");
    assert_eq!(config.realtime.ack_timeout_ms, 10_000);
}

#[test]
fn default_config_toml_is_valid() {
    use super::template::default_config_toml;
    use crate::schema::InsforgeConfig;

    let config: InsforgeConfig = toml::from_str(&default_config_toml()).unwrap();
    assert!(crate::validation::validate(&config).is_ok());
}

#[test]
fn default_config_path_is_reasonable() {
    if let Ok(path) = default_config_path() {
        let path_str = path.to_string_lossy();
        assert!(path_str.contains("insforge"));
        assert!(path_str.ends_with("config.toml"));
    }
}
