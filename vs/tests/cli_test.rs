//! Integration tests for the vs binary

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// A `vs` command isolated from the user's config, data and working dirs
fn vs(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("vs"));
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_demo_silent() {
    let temp = TempDir::new().expect("Failed to create temp dir");

    vs(temp.path())
        .args(["demo", "--strategy", "silent", "--epochs", "2", "--batches", "3", "--delay-ms", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 epochs, 6 batches"))
        .stdout(predicate::str::contains("Epoch").not())
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_demo_print() {
    let temp = TempDir::new().expect("Failed to create temp dir");

    vs(temp.path())
        .args(["demo", "--strategy", "print", "--epochs", "2", "--batches", "2", "--delay-ms", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Starting training for 2 epochs..."))
        .stdout(predicate::str::contains("  Batch 1, loss="))
        .stdout(predicate::str::contains("Epoch 1/2 completed - avg_loss="))
        .stdout(predicate::str::contains("Training completed!"));
}

#[test]
fn test_demo_progress_degrades_without_terminal() {
    let temp = TempDir::new().expect("Failed to create temp dir");

    vs(temp.path())
        .args(["demo", "--strategy", "progress", "--epochs", "2", "--batches", "4", "--delay-ms", "0", "--lazy-batches"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Starting training for 2 epochs..."))
        .stderr(predicate::str::contains("Training completed!"));
}

#[test]
fn test_demo_file_from_config() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let log = temp.path().join("out").join("train.log");
    let config = temp.path().join("verbosity.yml");
    fs::write(&config, format!("strategy: file\nlog-file: {}\n", log.display())).unwrap();

    vs(temp.path())
        .arg("--config")
        .arg(&config)
        .args(["demo", "--epochs", "1", "--batches", "2", "--delay-ms", "0", "--no-batches"])
        .assert()
        .success();

    let content = fs::read_to_string(&log).expect("log file written");
    assert!(content.contains("Epoch 0/1 completed - avg_loss="));
    assert!(!content.contains("Batch"));
}

#[test]
fn test_local_config_is_picked_up() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    fs::write(temp.path().join(".verbosity.yml"), "strategy: print\nlayout: sequential\n").unwrap();

    vs(temp.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("strategy: print"))
        .stdout(predicate::str::contains("layout: sequential"));
}

#[test]
fn test_config_defaults() {
    let temp = TempDir::new().expect("Failed to create temp dir");

    vs(temp.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("strategy: progress"))
        .stdout(predicate::str::contains("log-file:"));
}

#[test]
fn test_missing_config_fails() {
    let temp = TempDir::new().expect("Failed to create temp dir");

    vs(temp.path())
        .args(["--config", "nope.yml", "config"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn test_unknown_strategy_fails() {
    let temp = TempDir::new().expect("Failed to create temp dir");

    vs(temp.path())
        .args(["demo", "--strategy", "tqdm"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}
