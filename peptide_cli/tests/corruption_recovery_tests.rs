//! Corruption recovery tests for the peptide binary.
//!
//! These tests verify the system can handle:
//! - A corrupted worker checkpoint
//! - A corrupted reminder log
//! - A corrupted schedule store

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write as IoWrite;
use std::path::Path;
use tempfile::TempDir;

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("peptide"))
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn add_daily(data_dir: &Path) {
    cli()
        .arg("add")
        .arg("--user")
        .arg("7")
        .arg("GHK-Cu 1.5mg daily for 5 weeks")
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--now")
        .arg("2026-01-05T08:00:00Z")
        .assert()
        .success();
}

#[test]
fn test_corrupted_worker_state_is_first_run() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    add_daily(&data_dir);
    fs::write(data_dir.join("worker_state.json"), "{ invalid json }}}}")
        .expect("Failed to write corrupted state");

    // No replay: only the current day is evaluated
    cli()
        .arg("run")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--now")
        .arg("2026-01-09T09:00:00Z")
        .assert()
        .success()
        .stdout(predicate::str::contains("Evaluated 1 day(s): 2026-01-09"));

    // The checkpoint is rewritten
    let state = fs::read_to_string(data_dir.join("worker_state.json")).unwrap();
    assert!(state.contains("2026-01-09T09:00:00"));
}

#[test]
fn test_empty_worker_state_is_first_run() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    add_daily(&data_dir);
    fs::write(data_dir.join("worker_state.json"), "").unwrap();

    cli()
        .arg("run")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--now")
        .arg("2026-01-09T09:00:00Z")
        .assert()
        .success()
        .stdout(predicate::str::contains("Dose reminders sent: 1"));
}

#[test]
fn test_partial_log_line_is_ignored() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    add_daily(&data_dir);
    cli()
        .arg("run")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--now")
        .arg("2026-01-05T09:00:00Z")
        .assert()
        .success();

    // Simulate a crash mid-append
    let mut file = fs::OpenOptions::new()
        .append(true)
        .open(data_dir.join("reminders.wal"))
        .unwrap();
    write!(file, "{{\"id\":\"partial").unwrap();
    drop(file);

    // The intact record still counts as delivered
    cli()
        .arg("run")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--now")
        .arg("2026-01-05T10:00:00Z")
        .assert()
        .success()
        .stdout(predicate::str::contains("Already sent earlier: 1"));
}

#[test]
fn test_corrupted_schedule_store_is_an_error() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    fs::create_dir_all(&data_dir).unwrap();
    fs::write(data_dir.join("schedules.json"), "[{ not json").unwrap();

    cli()
        .arg("run")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--now")
        .arg("2026-01-05T09:00:00Z")
        .assert()
        .failure();

    // Nothing replaced the broken file
    let contents = fs::read_to_string(data_dir.join("schedules.json")).unwrap();
    assert_eq!(contents, "[{ not json");
    assert!(!data_dir.join("worker_state.json").exists());
}

#[test]
fn test_status_on_empty_data_dir() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("status")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No schedules."));
}
