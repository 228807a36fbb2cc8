//! Concurrency tests for the setlog binary.
//!
//! These tests verify that multiple processes can safely:
//! - Append completed workouts to the WAL simultaneously (file locking)
//! - Update the performance book without losing records
//! - Roll up while sessions are still being completed

use assert_cmd::Command;
use std::path::Path;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn cli() -> Command {
    Command::cargo_bin("setlog").expect("Failed to find setlog binary")
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Run one session that completes a single set of `exercise`
fn complete_session(data_dir: &Path, exercise: &str) {
    cli()
        .env("XDG_CONFIG_HOME", data_dir)
        .arg("start")
        .arg("--data-dir")
        .arg(data_dir)
        .write_stdin(format!("add {}\nreps 1 1 5\ndone 1 1\ncomplete\n", exercise))
        .timeout(Duration::from_secs(10))
        .assert()
        .success();
}

fn wal_lines(data_dir: &Path) -> Vec<String> {
    let wal_path = data_dir.join("wal/workouts.wal");
    std::fs::read_to_string(&wal_path)
        .expect("Failed to read WAL")
        .lines()
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

#[test]
fn test_sequential_sessions_all_logged() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    for i in 0..5 {
        thread::sleep(Duration::from_millis(i * 5));
        complete_session(&data_dir, "push_up");
    }

    assert_eq!(wal_lines(&data_dir).len(), 5);
}

#[test]
fn test_no_wal_corruption_under_load() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let data_dir = data_dir.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(i * 5));
                complete_session(&data_dir, "squat");
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let lines = wal_lines(&data_dir);
    for line in &lines {
        let parsed: Result<serde_json::Value, _> = serde_json::from_str(line);
        assert!(parsed.is_ok(), "WAL contains invalid JSON line: {}", line);
    }
    assert_eq!(lines.len(), 8, "Expected 8 valid workouts in WAL");
}

#[test]
fn test_performance_book_keeps_records_from_every_process() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    let handles: Vec<_> = ["squat", "deadlift", "bench_press"]
        .into_iter()
        .map(|exercise| {
            let data_dir = data_dir.clone();
            thread::spawn(move || complete_session(&data_dir, exercise))
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let content = std::fs::read_to_string(data_dir.join("wal/performance.json"))
        .expect("Failed to read performance book");
    let book: serde_json::Value =
        serde_json::from_str(&content).expect("Performance book is not valid JSON");
    for exercise in ["squat", "deadlift", "bench_press"] {
        assert!(
            book["records"].get(exercise).is_some(),
            "Missing record for {}",
            exercise
        );
    }
}

#[test]
fn test_rollup_while_writing() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    for _ in 0..3 {
        complete_session(&data_dir, "plank");
    }

    let data_dir_rollup = data_dir.clone();
    let rollup_handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(10));
        cli()
            .env("XDG_CONFIG_HOME", &data_dir_rollup)
            .arg("rollup")
            .arg("--data-dir")
            .arg(&data_dir_rollup)
            .assert()
            .success();
    });

    for _ in 0..2 {
        complete_session(&data_dir, "plank");
        thread::sleep(Duration::from_millis(5));
    }

    rollup_handle.join().expect("Rollup thread panicked");

    assert!(data_dir.join("workouts.csv").exists());

    // Sessions completed before the rollup started must be in the CSV
    cli()
        .env("XDG_CONFIG_HOME", &data_dir)
        .arg("rollup")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success();
    let csv = std::fs::read_to_string(data_dir.join("workouts.csv")).unwrap();
    assert!(csv.lines().count() >= 1 + 3);
}
