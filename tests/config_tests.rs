//! Configuration file loading tests

use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use subpull::config::Config;
use subpull::error::exit_code_of;
use subpull::request::FetchMode;
use subpull::system::RealSystem;
use tempfile::TempDir;

fn write_config(temp_dir: &TempDir, content: &str) -> String {
    let path = temp_dir.path().join("subpull.yaml");
    fs::write(&path, content).unwrap();
    path.to_str().unwrap().to_owned()
}

#[test]
fn test_load_and_resolve_full_config() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(
        &temp_dir,
        r"
destination: /srv/checkouts
mode: sparse
branch: release/2.0
api_url: https://ghe.example.com/api/v3
git_base_url: https://ghe.example.com
max_concurrency: 16
timeout_secs: 30
strict: true
",
    );

    let settings = Config::load_from_file(&RealSystem::new(), &path)
        .unwrap()
        .resolve();

    assert_eq!(settings.destination, PathBuf::from("/srv/checkouts"));
    assert_eq!(settings.mode, FetchMode::SparseCheckout);
    assert_eq!(settings.branch, "release/2.0");
    assert_eq!(settings.api_url, "https://ghe.example.com/api/v3");
    assert_eq!(settings.git_base_url, "https://ghe.example.com");
    assert_eq!(settings.max_concurrency, 16);
    assert_eq!(settings.timeout, Duration::from_secs(30));
    assert!(settings.strict);
}

#[test]
fn test_partial_config_keeps_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, "branch: develop\n");

    let settings = Config::load_from_file(&RealSystem::new(), &path)
        .unwrap()
        .resolve();

    assert_eq!(settings.branch, "develop");
    assert_eq!(settings.mode, FetchMode::Api);
    assert_eq!(settings.max_concurrency, 8);
}

#[test]
fn test_schema_errors_are_configuration_errors() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, "max_concurrency: -1\ntimeout_secs: 0\n");

    let err = Config::load_from_file(&RealSystem::new(), &path).unwrap_err();

    assert_eq!(exit_code_of(&err), 1);
    assert!(err.to_string().contains("Configuration validation failed"));
}

#[test]
fn test_unknown_keys_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, "repository: octo/hello\n");

    let err = Config::load_from_file(&RealSystem::new(), &path).unwrap_err();
    assert_eq!(exit_code_of(&err), 1);
}

#[test]
fn test_malformed_yaml() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, "branch: [unterminated\n");

    let err = Config::load_from_file(&RealSystem::new(), &path).unwrap_err();
    assert_eq!(exit_code_of(&err), 1);
    assert!(err.to_string().contains("Failed to parse YAML"));
}
