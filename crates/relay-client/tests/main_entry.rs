//! Integration tests for the `relay` binary entry point.
//!
//! Covers start-up validation failures, which must exit non-zero with a
//! readable message before any connection is attempted.

use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;
use tempfile::TempDir;

fn relay(dir: &TempDir, config: &str) -> assert_cmd::Command {
    let path = dir.path().join("relay.toml");
    fs::write(&path, config).expect("write configuration");
    let mut command = cargo_bin_cmd!("relay");
    for key in ["RELAY_CLIENT_ID", "RELAY_ADDRESSES", "RELAY_CONFIG_PATH", "RELAY_MODE"] {
        command.env_remove(key);
    }
    command.current_dir(dir.path()).arg("--config-path").arg(path);
    command
}

#[test]
fn missing_client_id_exits_with_failure() {
    let dir = TempDir::new().expect("temp dir");
    let mut command = relay(&dir, "addresses = [\"127.0.0.1:7000\"]\n");
    command
        .assert()
        .failure()
        .stderr(contains("a unique client id must be provided"));
}

#[test]
fn missing_addresses_exit_with_failure() {
    let dir = TempDir::new().expect("temp dir");
    let mut command = relay(&dir, "client_id = 7\n");
    command
        .assert()
        .failure()
        .stderr(contains("at least one replica address must be configured"));
}

#[test]
fn workload_mode_requires_a_workload_file() {
    let dir = TempDir::new().expect("temp dir");
    let mut command = relay(
        &dir,
        "client_id = 7\naddresses = [\"127.0.0.1:7000\"]\nmode = \"workload\"\n",
    );
    command
        .assert()
        .failure()
        .stderr(contains("workload mode requires workload_path"));
}
