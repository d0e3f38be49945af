//! Concurrency tests for the lift binary.
//!
//! These tests verify that multiple processes can safely:
//! - Append to the WAL at the same time (file locking)
//! - Update the defaults file one after another
//! - Read history while sessions are being logged

use assert_cmd::Command;
use std::path::Path;
use std::thread;
use tempfile::TempDir;

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("lift"))
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn run_session(data_dir: &Path, user: &str) {
    cli()
        .arg("start")
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--user")
        .arg(user)
        .arg("--auto-complete")
        .assert()
        .success();
}

#[test]
fn test_concurrent_session_logging() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    thread::scope(|scope| {
        for i in 0..5 {
            let data_dir = &data_dir;
            scope.spawn(move || run_session(data_dir, &format!("user{}", i)));
        }
    });

    let wal_path = data_dir.join("wal/completions.wal");
    let wal_content = std::fs::read_to_string(&wal_path).expect("Failed to read WAL");

    // Every line is a whole record
    let mut users: Vec<String> = wal_content
        .lines()
        .map(|line| {
            let record: serde_json::Value =
                serde_json::from_str(line).expect("WAL line should be intact");
            record["user_id"].as_str().unwrap().to_string()
        })
        .collect();
    users.sort();

    assert_eq!(users, vec!["user0", "user1", "user2", "user3", "user4"]);
}

#[test]
fn test_sequential_defaults_updates() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    for (exercise, weight) in [("barbell_squat", "110"), ("lunge", "35"), ("barbell_squat", "115")] {
        cli()
            .args(["defaults", "set", exercise, "--weight", weight])
            .arg("--data-dir")
            .arg(&data_dir)
            .assert()
            .success();
    }

    let content = std::fs::read_to_string(data_dir.join("defaults.json")).unwrap();
    let state: serde_json::Value = serde_json::from_str(&content).unwrap();
    let local = &state["users"]["local"];
    assert_eq!(local["barbell_squat"]["default_weight_kg"], 115.0);
    assert_eq!(local["lunge"]["default_weight_kg"], 35.0);
}

#[test]
fn test_reads_during_writes() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    run_session(&data_dir, "local");

    thread::scope(|scope| {
        for _ in 0..3 {
            let data_dir = &data_dir;
            scope.spawn(move || run_session(data_dir, "local"));
        }

        // Readers can plan at any time
        for _ in 0..3 {
            cli()
                .arg("start")
                .arg("--data-dir")
                .arg(&data_dir)
                .arg("--dry-run")
                .assert()
                .success();
        }
    });

    let wal_content =
        std::fs::read_to_string(data_dir.join("wal/completions.wal")).unwrap();
    assert_eq!(wal_content.lines().count(), 4);
}
