//! Configuration resolution tests
//!
//! Tests that manipulate ASPH_CONFIG are marked #[serial] so they do not race
//! on the process environment.

use asph_common::config::{AsphConfig, CONFIG_ENV_VAR};
use asph_common::Error;
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

fn write_config(dir: &TempDir, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, text).unwrap();
    path
}

#[test]
#[serial]
fn test_cli_argument_takes_priority() {
    let dir = TempDir::new().unwrap();
    let cli = write_config(&dir, "cli.toml", "[playback]\nlooping = true\n");
    let envf = write_config(&dir, "env.toml", "[playback]\nlooping = false\n");
    env::set_var(CONFIG_ENV_VAR, &envf);

    let config = AsphConfig::resolve(Some(&cli)).unwrap();
    assert!(config.playback.looping);

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_used_without_cli() {
    let dir = TempDir::new().unwrap();
    let envf = write_config(&dir, "env.toml", "[logging]\nlevel = \"debug\"\n");
    env::set_var(CONFIG_ENV_VAR, &envf);

    let config = AsphConfig::resolve(None).unwrap();
    assert_eq!(config.logging.level, "debug");

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_explicit_missing_file_is_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");
    let err = AsphConfig::resolve(Some(&missing)).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
#[serial]
fn test_malformed_file_is_error() {
    let dir = TempDir::new().unwrap();
    let bad = write_config(&dir, "bad.toml", "[playback]\nbuffer_ms = -3\n");
    assert!(matches!(
        AsphConfig::resolve(Some(&bad)),
        Err(Error::Config(_))
    ));
}

#[test]
fn test_load_file_normalizes_values() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "limits.toml",
        "[playback]\npause_poll_ms = 250\ncommand_queue_depth = 0\n",
    );
    let config = AsphConfig::load_file(&path).unwrap();
    assert_eq!(config.playback.pause_poll_ms, 100);
    assert_eq!(config.playback.command_queue_depth, 1);
    assert_eq!(config.adjustments.len(), 2);
}
