//! Corruption recovery tests for mcoach.
//!
//! These tests verify the system can handle:
//! - Corrupted store files (moved aside, never overwritten)
//! - Corrupted intake log lines
//! - Missing data directories

use assert_cmd::Command;
use std::fs;
use std::io::Write as IoWrite;
use std::path::Path;
use tempfile::TempDir;

fn cli(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("mcoach"));
    cmd.env("XDG_CONFIG_HOME", dir.join("config"))
        .arg("--data-dir")
        .arg(dir.join("data"));
    cmd
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

#[test]
fn test_corrupted_store_file() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();

    let store_path = data_dir.join("store.json");
    fs::write(&store_path, "{ invalid json }}}}").expect("Failed to write corrupted store");

    cli(temp_dir.path())
        .args(["plan", "--date", "2024-06-01"])
        .assert()
        .success();

    // The store was replaced with a valid document
    let contents = fs::read_to_string(&store_path).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert!(doc["targets"]["2024-06-01"].is_object());

    // The corrupt bytes were kept next to it
    let backups: Vec<_> = fs::read_dir(&data_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            p.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("store.json.corrupt-")
        })
        .collect();
    assert_eq!(backups.len(), 1);
    assert_eq!(
        fs::read_to_string(&backups[0]).unwrap(),
        "{ invalid json }}}}"
    );
}

#[test]
fn test_corrupted_intake_lines_skipped() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();

    let log_path = data_dir.join("intake.jsonl");
    {
        let mut file = fs::File::create(&log_path).unwrap();
        writeln!(file, "{{ not an entry").unwrap();
        writeln!(file, "[1, 2, 3]").unwrap();
    }

    cli(temp_dir.path())
        .args(["intake", "--date", "2024-07-01", "--kcal", "400"])
        .assert()
        .success()
        .stdout(predicates::str::contains("Total 400 kcal"));
}

#[test]
fn test_empty_store_file() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();
    fs::write(data_dir.join("store.json"), "").unwrap();

    cli(temp_dir.path())
        .args(["predict"])
        .assert()
        .success()
        .stdout(predicates::str::contains("No history yet"));
}

#[test]
fn test_missing_data_dir_is_created() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");
    assert!(!data_dir.exists());

    cli(temp_dir.path())
        .args(["log", "--date", "2024-06-01", "--weight", "88.2"])
        .assert()
        .success();

    assert!(data_dir.join("store.json").exists());
}
