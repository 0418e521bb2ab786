//! Integration tests for the liftlog binary.
//!
//! These tests verify end-to-end behavior including:
//! - User and exercise registration
//! - The workout flow (start, set, finish)
//! - Personal record and achievement notices
//! - Persistence across invocations
//! - CSV export

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Helper to get the path to the CLI binary
fn cli(data_dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("liftlog"));
    cmd.arg("--data-dir").arg(data_dir);
    cmd
}

/// Register a user and one exercise
fn seed(data_dir: &Path) {
    cli(data_dir)
        .args(["init", "Alex", "--gender", "male"])
        .assert()
        .success();
    cli(data_dir)
        .args(["exercise", "Bench Press", "--category", "chest"])
        .assert()
        .success();
}

#[test]
fn test_cli_help() {
    Command::new(assert_cmd::cargo::cargo_bin!("liftlog"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Workout analytics and personal record tracker",
        ));
}

#[test]
fn test_init_creates_store_file() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli(data_dir)
        .args(["init", "Alex", "--gender", "male"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Registered user Alex"));

    assert!(data_dir.join("liftlog.json").exists());
}

#[test]
fn test_duplicate_init_fails() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli(data_dir)
        .args(["init", "Alex", "--gender", "male"])
        .assert()
        .success();
    cli(data_dir)
        .args(["init", "Alex", "--gender", "male"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_set_without_open_workout_fails() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    seed(data_dir);

    cli(data_dir)
        .args(["set", "Bench Press", "100", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no open workout"));
}

#[test]
fn test_unknown_exercise_fails_with_hint() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    seed(data_dir);

    cli(data_dir).args(["start", "Push Day"]).assert().success();
    cli(data_dir)
        .args(["set", "Squat", "100", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown exercise"));
}

#[test]
fn test_full_workout_flow() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    seed(data_dir);

    // Starting the first workout already unlocks the count achievement
    cli(data_dir)
        .args(["start", "Push Day"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Achievement unlocked: First Workout"));

    // First working set: all three record kinds
    cli(data_dir)
        .args(["set", "Bench Press", "100", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("New max_weight record"))
        .stdout(predicate::str::contains("New max_1rm record"))
        .stdout(predicate::str::contains("New max_volume_set record"));

    cli(data_dir)
        .arg("finish")
        .assert()
        .success()
        .stdout(predicate::str::contains("Finished 'Push Day'"))
        .stdout(predicate::str::contains("500 volume"));

    cli(data_dir)
        .arg("records")
        .assert()
        .success()
        .stdout(predicate::str::contains("Bench Press"))
        .stdout(predicate::str::contains("max_weight"));

    cli(data_dir)
        .arg("achievements")
        .assert()
        .success()
        .stdout(predicate::str::contains("First Workout"))
        .stdout(predicate::str::contains("unlocked"));

    cli(data_dir)
        .arg("streak")
        .assert()
        .success()
        .stdout(predicate::str::contains("Current streak: 1 days"));
}

#[test]
fn test_weaker_set_produces_no_record_notice() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    seed(data_dir);

    cli(data_dir).args(["start", "Push Day"]).assert().success();
    cli(data_dir)
        .args(["set", "Bench Press", "100", "5"])
        .assert()
        .success();

    cli(data_dir)
        .args(["set", "Bench Press", "80", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("New max_weight record").not());
}

#[test]
fn test_warmup_set_creates_no_records() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    seed(data_dir);

    cli(data_dir).args(["start", "Push Day"]).assert().success();
    cli(data_dir)
        .args(["set", "Bench Press", "200", "5", "--warmup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("warmup"))
        .stdout(predicate::str::contains("record").not());

    cli(data_dir)
        .arg("records")
        .assert()
        .success()
        .stdout(predicate::str::contains("No personal records yet"));
}

#[test]
fn test_double_start_fails() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    seed(data_dir);

    cli(data_dir).args(["start", "Push Day"]).assert().success();
    cli(data_dir)
        .args(["start", "Leg Day"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already open"));
}

#[test]
fn test_measure_and_stats() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    seed(data_dir);

    cli(data_dir)
        .args(["measure", "82.5", "--body-fat", "18"])
        .assert()
        .success()
        .stdout(predicate::str::contains("82.5 kg"));

    cli(data_dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Latest weight: 82.5 kg"))
        .stdout(predicate::str::contains("This week:"));
}

#[test]
fn test_export_creates_csv() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    seed(data_dir);

    cli(data_dir).args(["start", "Push Day"]).assert().success();
    cli(data_dir)
        .args(["set", "Bench Press", "100", "5"])
        .assert()
        .success();
    cli(data_dir).arg("finish").assert().success();

    let csv_path = data_dir.join("history.csv");
    cli(data_dir)
        .arg("export")
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 set rows"));

    let contents = fs::read_to_string(&csv_path).expect("Failed to read CSV");
    assert!(contents.contains("workout_name"));
    assert!(contents.contains("Bench Press"));
}

#[test]
fn test_sync_is_idempotent() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    seed(data_dir);

    cli(data_dir).args(["start", "Push Day"]).assert().success();
    cli(data_dir)
        .args(["set", "Bench Press", "100", "5"])
        .assert()
        .success();

    // Everything was already granted by the set command
    cli(data_dir)
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing new to grant"));
}

#[test]
fn test_macros_use_registered_gender() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    seed(data_dir);

    cli(data_dir)
        .args([
            "macros",
            "--age",
            "30",
            "--height-cm",
            "180",
            "--weight-kg",
            "80",
        ])
        .assert()
        .success()
        // Mifflin-St Jeor, male branch: 1780 kcal
        .stdout(predicate::str::contains("BMR:      1780 kcal"))
        .stdout(predicate::str::contains("Protein:  160 g"));
}

#[test]
fn test_wilks_with_pound_inputs() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    seed(data_dir);

    // 176.37 lb -> 80 kg, 1102.31 lb -> 500 kg
    cli(data_dir)
        .args(["wilks", "--bodyweight", "176.3696", "--total", "1102.31", "--lb"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wilks score: 341.35"));
}

#[test]
fn test_multiple_users_require_flag() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    seed(data_dir);
    cli(data_dir)
        .args(["init", "Sam", "--gender", "female"])
        .assert()
        .success();

    cli(data_dir)
        .arg("streak")
        .assert()
        .failure()
        .stderr(predicate::str::contains("multiple users"));

    cli(data_dir)
        .args(["--user", "Sam", "streak"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Current streak: 0 days"));
}

#[test]
fn test_state_persists_across_runs() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    seed(data_dir);

    cli(data_dir).args(["start", "Day 1"]).assert().success();
    cli(data_dir)
        .args(["set", "Bench Press", "100", "5"])
        .assert()
        .success();
    cli(data_dir).arg("finish").assert().success();

    // A fresh invocation sees the persisted records
    cli(data_dir)
        .arg("records")
        .assert()
        .success()
        .stdout(predicate::str::contains("max_weight"));
}
