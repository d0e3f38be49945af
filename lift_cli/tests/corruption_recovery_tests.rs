//! Corruption recovery tests for the lift binary.
//!
//! These tests verify the system can handle:
//! - Corrupted defaults files
//! - Corrupted WAL files
//! - Corrupted or invalid templates
//! - An unwritable WAL location

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("lift"))
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

#[test]
fn test_corrupted_defaults_file() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    fs::write(data_dir.join("defaults.json"), "{ invalid json }}}}")
        .expect("Failed to write corrupted defaults");

    cli()
        .arg("start")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--auto-complete")
        .assert()
        .success()
        .stdout(predicate::str::contains("Workout logged"));
}

#[test]
fn test_corrupted_wal_lines_skipped() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    fs::create_dir_all(data_dir.join("wal")).unwrap();
    let wal_path = data_dir.join("wal/completions.wal");
    fs::write(&wal_path, "{ invalid json }\n{ more invalid }\n")
        .expect("Failed to write corrupted WAL");

    cli()
        .arg("start")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--auto-complete")
        .assert()
        .success();

    // The new record is appended after the bad lines
    let content = fs::read_to_string(&wal_path).unwrap();
    let last = content.lines().last().unwrap();
    let record: serde_json::Value = serde_json::from_str(last).unwrap();
    assert_eq!(record["entries"].as_array().unwrap().len(), 7);
}

#[test]
fn test_partial_wal_line_skipped() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    fs::create_dir_all(data_dir.join("wal")).unwrap();
    fs::write(
        data_dir.join("wal/completions.wal"),
        r#"{"id":"6f1c1f8e-8d0b-4a35-9d35-2d6a3b0a9c11","user_id":"local","work"#,
    )
    .unwrap();

    cli()
        .arg("start")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Barbell Squats - 4 x 8 @ 100kg"));
}

#[test]
fn test_corrupted_templates_file_fails_to_load() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    fs::write(data_dir.join("workouts.json"), "[{ not a template").unwrap();

    cli()
        .arg("start")
        .arg("push")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--auto-complete")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load workout"));

    assert!(!data_dir.join("wal/completions.wal").exists());
}

#[test]
fn test_corrupted_templates_do_not_block_demo() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    fs::write(data_dir.join("workouts.json"), "garbage").unwrap();

    cli()
        .arg("start")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--dry-run")
        .assert()
        .success();
}

#[test]
fn test_empty_workout_fails() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    fs::write(
        data_dir.join("workouts.json"),
        r#"[{"id": "rest_day", "name": "Rest Day", "exercises": []}]"#,
    )
    .unwrap();

    cli()
        .arg("start")
        .arg("rest_day")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--auto-complete")
        .assert()
        .failure()
        .stderr(predicate::str::contains("has no exercises"));
}

#[test]
fn test_zero_set_exercise_rejected() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    fs::write(
        data_dir.join("workouts.json"),
        r#"[{"id": "odd", "name": "Odd", "exercises": [
            {"workout_exercise_id": "odd-1", "exercise_id": "curl", "name": "Curl",
             "order_index": 0, "target_sets": 0, "target_reps": 10}
        ]}]"#,
    )
    .unwrap();

    cli()
        .arg("start")
        .arg("odd")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--auto-complete")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Template validation error"));
}

#[test]
fn test_unwritable_wal_still_completes() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    // A file where the WAL directory should be
    fs::write(data_dir.join("wal"), "not a directory").unwrap();

    cli()
        .arg("start")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--auto-complete")
        .assert()
        .success()
        .stdout(predicate::str::contains("WORKOUT COMPLETE"))
        .stdout(predicate::str::contains("could not be saved"));
}

#[test]
fn test_unreadable_history_does_not_block_start() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    // A directory where the WAL file should be
    fs::create_dir_all(data_dir.join("wal/completions.wal")).unwrap();

    cli()
        .arg("start")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--auto-complete")
        .assert()
        .success()
        .stdout(predicate::str::contains("Barbell Squats - 4 x 8 @ 100kg"))
        .stdout(predicate::str::contains("WORKOUT COMPLETE"));
}

#[test]
fn test_unreadable_history_keeps_load_error() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    fs::create_dir_all(data_dir.join("wal/completions.wal")).unwrap();

    cli()
        .arg("start")
        .arg("missing")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--auto-complete")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Workout not found: missing"));
}
