//! Integration tests for the mediacast-bot daemon.
//!
//! The daemon needs a reachable Bot API to get past startup, so these
//! tests only cover the launch path: CLI surface, config resolution,
//! and the documented exit codes.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn bot_cmd() -> Command {
    Command::cargo_bin("mediacast-bot").unwrap()
}

#[test]
fn help_describes_the_daemon() {
    bot_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("media queue broadcast daemon"))
        .stdout(predicate::str::contains("SIGTERM"));
}

#[test]
fn missing_config_exits_with_config_code() {
    bot_cmd()
        .env("MEDIACAST_CONFIG", "/nonexistent/mediacast/config.toml")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn malformed_config_exits_with_config_code() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, "[telegram\ntoken = ").unwrap();

    bot_cmd()
        .env("MEDIACAST_CONFIG", &config_path)
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn explicit_config_flag_overrides_env() {
    let dir = TempDir::new().unwrap();
    let broken = dir.path().join("broken.toml");
    std::fs::write(&broken, "not toml [[[").unwrap();

    // The env var points somewhere valid-looking; the flag's broken
    // file must win.
    bot_cmd()
        .env("MEDIACAST_CONFIG", "/nonexistent/config.toml")
        .args(["--config", broken.to_str().unwrap()])
        .assert()
        .failure()
        .code(2);
}
