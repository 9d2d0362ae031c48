//! Concurrency tests for mcoach.
//!
//! These tests verify that multiple processes can safely:
//! - Update the metrics store at the same time (sidecar lock)
//! - Append to the intake log at the same time
//! - Read while others write

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use std::thread;
use tempfile::TempDir;

fn cli(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("mcoach"));
    cmd.env("XDG_CONFIG_HOME", dir.join("config"))
        .env_remove("RUST_LOG")
        .arg("--data-dir")
        .arg(dir.join("data"));
    cmd
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn spawn_all(dir: &Path, runs: Vec<Vec<String>>) {
    let handles: Vec<_> = runs
        .into_iter()
        .map(|args| {
            let dir: PathBuf = dir.to_path_buf();
            thread::spawn(move || {
                cli(&dir).args(&args).assert().success();
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("CLI thread panicked");
    }
}

#[test]
fn test_concurrent_log_keeps_every_day() {
    let temp_dir = setup_test_dir();

    let runs = (1..=8)
        .map(|day| {
            vec![
                "log".to_string(),
                "--date".to_string(),
                format!("2024-08-{:02}", day),
                "--weight".to_string(),
                "88.0".to_string(),
            ]
        })
        .collect();
    spawn_all(temp_dir.path(), runs);

    let store = std::fs::read_to_string(temp_dir.path().join("data/store.json"))
        .expect("Failed to read store");
    let doc: serde_json::Value = serde_json::from_str(&store).unwrap();
    assert_eq!(
        doc["metrics"].as_object().unwrap().len(),
        8,
        "Expected 8 metric days"
    );
}

#[test]
fn test_concurrent_intake_appends() {
    let temp_dir = setup_test_dir();

    let runs = (0..6)
        .map(|i| {
            vec![
                "intake".to_string(),
                "--date".to_string(),
                "2024-08-01".to_string(),
                "--kcal".to_string(),
                format!("{}", 100 + i),
            ]
        })
        .collect();
    spawn_all(temp_dir.path(), runs);

    let log = std::fs::read_to_string(temp_dir.path().join("data/intake.jsonl"))
        .expect("Failed to read intake log");
    assert_eq!(log.lines().count(), 6);
}

#[test]
fn test_reads_during_writes() {
    let temp_dir = setup_test_dir();

    let mut runs: Vec<Vec<String>> = (1..=4)
        .map(|day| {
            vec![
                "log".to_string(),
                "--date".to_string(),
                format!("2024-09-{:02}", day),
                "--fatigue".to_string(),
                "5".to_string(),
            ]
        })
        .collect();
    runs.extend((0..4).map(|_| vec!["predict".to_string()]));
    spawn_all(temp_dir.path(), runs);

    cli(temp_dir.path())
        .args(["predict", "--json"])
        .assert()
        .success();
}
