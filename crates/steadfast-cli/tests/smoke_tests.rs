//! Smoke tests for the steadfast CLI
//!
//! Nothing here launches a browser; `run` is only exercised up to the point
//! where its arguments are rejected.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get a command for the steadfast binary with a clean environment
fn steadfast() -> Command {
    let mut cmd = Command::cargo_bin("steadfast").expect("steadfast binary should exist");
    for key in [
        "STEADFAST_CONFIG",
        "STEADFAST_BASE_URL",
        "STEADFAST_HEADLESS",
        "STEADFAST_CHROMIUM_PATH",
        "STEADFAST_MAX_ATTEMPTS",
        "STEADFAST_USERNAME",
        "STEADFAST_PASSWORD",
        "RUST_LOG",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    steadfast()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_flag() {
    steadfast()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("scenarios"))
        .stdout(predicate::str::contains("--log-format"));
}

#[test]
fn test_no_args_shows_help() {
    steadfast().assert().failure();
}

#[test]
fn test_run_help_lists_credentials() {
    steadfast()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--username"))
        .stdout(predicate::str::contains("STEADFAST_PASSWORD"));
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_scenarios_lists_all() {
    steadfast()
        .args(["--color", "never", "scenarios"])
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("add-device"))
        .stdout(predicate::str::contains("launch-filter"))
        .stdout(predicate::str::contains("ledger-report"));
}

#[test]
fn test_unknown_scenario_fails() {
    steadfast()
        .args(["run", "checkout", "--username", "admin"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown scenario 'checkout'"));
}

#[test]
fn test_run_without_username_fails_before_launch() {
    steadfast()
        .args(["run", "login"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("STEADFAST_USERNAME"));
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn test_config_prints_defaults() {
    steadfast()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("max_attempts: 3"))
        .stdout(predicate::str::contains("headless: true"));
}

#[test]
fn test_config_merges_file_env_and_flags() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("steadfast.yaml");
    fs::write(
        &path,
        "engine:\n  retry:\n    max_attempts: 4\nsession:\n  base_url: https://file.test/login\n",
    )
    .unwrap();

    steadfast()
        .arg("--config")
        .arg(&path)
        .args(["config", "--headed"])
        .env("STEADFAST_BASE_URL", "https://env.test/login")
        .assert()
        .success()
        .stdout(predicate::str::contains("max_attempts: 4"))
        .stdout(predicate::str::contains("https://env.test/login"))
        .stdout(predicate::str::contains("headless: false"));
}

#[test]
fn test_config_rejects_bad_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.yaml");
    fs::write(&path, "engine:\n  retry:\n    max_attempts: 0\n").unwrap();

    steadfast()
        .arg("--config")
        .arg(&path)
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_attempts"));
}
