//! Malformed configuration must fail at load time, before any request.

use std::ffi::OsString;
use std::fs;

use ortho_config::OrthoConfig;
use relay_config::{ClientSettings, Config, ConfigError};
use tempfile::TempDir;

#[test]
fn malformed_file_fails_to_load() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let path = temp_dir.path().join("relay.toml");
    fs::write(&path, "timeout_ms = \"soon\"\n").expect("write malformed config");

    let args = vec![
        OsString::from("relay"),
        OsString::from("--config-path"),
        path.into_os_string(),
    ];
    assert!(
        Config::load_from_iter(args).is_err(),
        "a non-numeric timeout must be rejected"
    );
}

#[test]
fn missing_client_id_is_a_startup_error() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let path = temp_dir.path().join("relay.toml");
    fs::write(&path, "addresses = [\"127.0.0.1:7000\"]\n").expect("write config");

    let args = vec![
        OsString::from("relay"),
        OsString::from("--config-path"),
        path.into_os_string(),
    ];
    let config = Config::load_from_iter(args).expect("config without id still loads");
    let error = ClientSettings::try_from(&config).expect_err("settings must require an id");
    assert!(matches!(error, ConfigError::MissingClientId));
}
