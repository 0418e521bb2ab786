//! Recovery behavior for damaged or unexpected store files.
//!
//! A corrupted snapshot must never brick the CLI: the store warns and
//! starts empty, and the next save writes a valid snapshot again.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn cli(data_dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("liftlog"));
    cmd.arg("--data-dir").arg(data_dir);
    cmd
}

#[test]
fn test_corrupted_store_starts_empty() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    fs::create_dir_all(data_dir).unwrap();
    fs::write(data_dir.join("liftlog.json"), "{ not json at all").unwrap();

    // The corrupted snapshot is discarded; the CLI behaves like a fresh
    // install and asks for init
    cli(data_dir)
        .arg("streak")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no user registered"));

    // Re-initializing overwrites the damaged file with a valid snapshot
    cli(data_dir)
        .args(["init", "Alex", "--gender", "male"])
        .assert()
        .success();

    let contents = fs::read_to_string(data_dir.join("liftlog.json")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&contents).expect("valid JSON snapshot");
    assert_eq!(parsed["users"].as_object().unwrap().len(), 1);
}

#[test]
fn test_snapshot_shape_after_workout() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli(data_dir)
        .args(["init", "Alex", "--gender", "male"])
        .assert()
        .success();
    cli(data_dir)
        .args(["exercise", "Deadlift", "--category", "back"])
        .assert()
        .success();
    cli(data_dir).args(["start", "Pull Day"]).assert().success();
    cli(data_dir)
        .args(["set", "Deadlift", "140", "3"])
        .assert()
        .success();
    cli(data_dir).arg("finish").assert().success();

    let contents = fs::read_to_string(data_dir.join("liftlog.json")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();

    assert_eq!(parsed["workouts"].as_array().unwrap().len(), 1);
    // One record per kind for the single exercise
    assert_eq!(parsed["records"].as_array().unwrap().len(), 3);
    // 140 kg unlocks both heavy-lifter tiers plus first-workout
    let slugs: Vec<_> = parsed["user_achievements"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["slug"].as_str().unwrap().to_string())
        .collect();
    assert!(slugs.contains(&"first-workout".to_string()));
    assert!(slugs.contains(&"heavy-lifter-140".to_string()));
}

#[test]
fn test_missing_data_dir_is_created_on_save() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("nested").join("deeper");

    cli(&data_dir)
        .args(["init", "Alex", "--gender", "male"])
        .assert()
        .success();

    assert!(data_dir.join("liftlog.json").exists());
}
