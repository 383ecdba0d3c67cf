//! Configuration loading and path resolution
//!
//! Tests that touch AUDIOCAT_* environment variables are marked #[serial] so
//! they never race each other.

use audiocat_common::config::{load_toml_config, resolve_path, ENV_CATALOG, ENV_ROOT};
use audiocat_common::Error;
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};

#[test]
fn test_missing_config_file_is_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = load_toml_config(&dir.path().join("absent.toml")).unwrap();
    assert!(loaded.is_none());

    let config = loaded.unwrap_or_default();
    assert!(config.root_folder.is_none());
    assert!(config.catalog_path.is_none());
    assert_eq!(config.logging.level, "info");
    assert!(config.logging.error_log.is_none());
    assert_eq!(config.sync.release_staleness_hours, 168);
}

#[test]
fn test_full_config_file_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
root_folder = "/srv/music"
catalog_path = "/var/lib/audiocat/catalog.db"

[logging]
level = "debug"
error_log = "/var/log/audiocat/errors.log"

[sync]
release_staleness_hours = 24
extraction_workers = 8
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap().expect("config file exists");
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/music")));
    assert_eq!(
        config.catalog_path,
        Some(PathBuf::from("/var/lib/audiocat/catalog.db"))
    );
    assert_eq!(config.logging.level, "debug");
    assert_eq!(
        config.logging.error_log,
        Some(PathBuf::from("/var/log/audiocat/errors.log"))
    );
    assert_eq!(config.sync.release_staleness_hours, 24);
    assert_eq!(config.sync.extraction_workers, 8);
}

#[test]
fn test_malformed_config_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "root_folder = [not valid").unwrap();

    match load_toml_config(&path) {
        Err(Error::Config(msg)) => assert!(msg.contains("config.toml")),
        other => panic!("Expected Config error, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_cli_wins_over_env_and_toml() {
    env::set_var(ENV_ROOT, "/from/env");

    let resolved = resolve_path(
        Some(Path::new("/from/cli")),
        ENV_ROOT,
        Some(Path::new("/from/toml")),
    );
    assert_eq!(resolved, Some(PathBuf::from("/from/cli")));

    env::remove_var(ENV_ROOT);
}

#[test]
#[serial]
fn test_env_wins_over_toml() {
    env::set_var(ENV_CATALOG, "/from/env/catalog.db");

    let resolved = resolve_path(None, ENV_CATALOG, Some(Path::new("/from/toml.db")));
    assert_eq!(resolved, Some(PathBuf::from("/from/env/catalog.db")));

    env::remove_var(ENV_CATALOG);
}

#[test]
#[serial]
fn test_blank_env_falls_through_to_toml() {
    env::set_var(ENV_ROOT, "   ");

    let resolved = resolve_path(None, ENV_ROOT, Some(Path::new("/from/toml")));
    assert_eq!(resolved, Some(PathBuf::from("/from/toml")));

    env::remove_var(ENV_ROOT);
}

#[test]
#[serial]
fn test_nothing_configured_resolves_to_none() {
    env::remove_var(ENV_ROOT);
    assert_eq!(resolve_path(None, ENV_ROOT, None), None);
}
