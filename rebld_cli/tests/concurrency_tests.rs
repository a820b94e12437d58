//! Concurrency tests for rebld.
//!
//! These tests verify that multiple processes can safely:
//! - Append finished workouts to the WAL simultaneously (file locking)
//! - Read history while another process writes
//! - Perform rollup operations without corruption

use assert_cmd::Command;
use std::thread;
use tempfile::TempDir;

fn cli(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("rebld"));
    cmd.env("XDG_CONFIG_HOME", temp_dir.path().join("config"));
    cmd
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn run_quick(temp_dir: &TempDir, routine: &str) {
    cli(temp_dir)
        .args(["run", "--quick", routine, "--auto-complete"])
        .arg("--data-dir")
        .arg(temp_dir.path().join("data"))
        .assert()
        .success();
}

#[test]
fn test_no_wal_corruption_under_parallel_writers() {
    let temp_dir = setup_test_dir();
    let routines = ["full_body_express", "core_finisher", "mobility_reset", "upper_push_pull"];

    thread::scope(|scope| {
        for routine in routines.iter().cycle().take(8) {
            let temp_dir = &temp_dir;
            scope.spawn(move || run_quick(temp_dir, routine));
        }
    });

    let wal_path = temp_dir.path().join("data/wal/workout_logs.wal");
    let content = std::fs::read_to_string(&wal_path).expect("Failed to read WAL");

    let lines: Vec<_> = content.lines().collect();
    assert_eq!(lines.len(), 8, "Expected 8 workouts, got {}", lines.len());
    for line in lines {
        let log: serde_json::Value =
            serde_json::from_str(line).expect("Interleaved or partial WAL line");
        assert!(log["id"].is_string());
    }
}

#[test]
fn test_concurrent_reads_and_writes() {
    let temp_dir = setup_test_dir();
    run_quick(&temp_dir, "full_body_express");

    thread::scope(|scope| {
        for _ in 0..3 {
            scope.spawn(|| run_quick(&temp_dir, "full_body_express"));
        }
        for _ in 0..3 {
            scope.spawn(|| {
                cli(&temp_dir)
                    .arg("prs")
                    .arg("--data-dir")
                    .arg(temp_dir.path().join("data"))
                    .assert()
                    .success();
            });
        }
    });

    let wal_path = temp_dir.path().join("data/wal/workout_logs.wal");
    let content = std::fs::read_to_string(&wal_path).unwrap();
    assert_eq!(content.lines().count(), 4);
}

#[test]
fn test_rollup_after_parallel_runs() {
    let temp_dir = setup_test_dir();

    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| run_quick(&temp_dir, "core_finisher"));
        }
    });

    cli(&temp_dir)
        .arg("rollup")
        .arg("--data-dir")
        .arg(temp_dir.path().join("data"))
        .assert()
        .success();

    // Header plus one row per set: 3 rounds of 3 exercises per workout
    let csv = std::fs::read_to_string(temp_dir.path().join("data/workouts.csv")).unwrap();
    assert_eq!(csv.lines().count(), 1 + 4 * 9);
}
