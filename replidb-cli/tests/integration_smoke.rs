//! Smoke tests for argument parsing and config loading

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Binary run from an empty directory so no stray .env or configs/ leak in.
fn replidb(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("replidb").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("APP_ENV")
        .env_remove("HTTP_PORT")
        .env("RUST_LOG", "off");
    cmd
}

#[test]
fn test_version() {
    let dir = TempDir::new().unwrap();
    replidb(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    replidb(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("--config"));
}

#[test]
fn test_missing_default_config_names_app_env_file() {
    let dir = TempDir::new().unwrap();
    replidb(&dir)
        .env("APP_ENV", "staging")
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("configs/config.staging.yaml"));
}

#[test]
fn test_invalid_config_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.yaml");
    fs::write(&path, "database: [1, 2, 3]\n").unwrap();

    replidb(&dir)
        .arg("--config")
        .arg(&path)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config file"));
}

#[test]
fn test_bad_http_port_override() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(
        &path,
        "database:\n  primary: \"127.0.0.1:1\"\n  username: u\n  password: p\n  database: d\n  max_open: 1\n  max_idle: 0\n",
    )
    .unwrap();

    replidb(&dir)
        .env("HTTP_PORT", "eighty")
        .arg("--config")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("HTTP_PORT"));
}

#[test]
fn test_status_with_unreachable_primary_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(
        &path,
        "database:\n  primary: \"127.0.0.1:1\"\n  username: u\n  password: p\n  database: d\n  max_open: 1\n  max_idle: 0\n  connect_timeout_secs: 1\n",
    )
    .unwrap();

    replidb(&dir)
        .arg("--config")
        .arg(&path)
        .arg("status")
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open database topology"));
}
