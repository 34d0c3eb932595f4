//! Corruption recovery tests for skincycle.
//!
//! These tests verify the system can handle:
//! - Corrupted profile and weather files
//! - Corrupted snapshot log lines
//! - Partial writes
//! - Corrupted attachment files
//! - Unreadable rule files

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write as IoWrite;
use std::path::PathBuf;
use tempfile::TempDir;

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("skincycle"))
}

fn setup_data_dir() -> (TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = temp_dir.path().to_path_buf();
    fs::write(
        data_dir.join("routine.csv"),
        "id,product_category,time_of_day,order,description\n\
         am-cleanse,cleanser,morning,1,Gel cleanser\n\
         wk-peel,exfoliator,weekly,1,AHA peel\n",
    )
    .expect("Failed to write routine");
    (temp_dir, data_dir)
}

#[test]
fn test_corrupted_profile_file() {
    let (_temp_dir, data_dir) = setup_data_dir();
    fs::write(data_dir.join("profile.json"), "{ invalid json }}}}")
        .expect("Failed to write corrupted profile");

    // Snapshot still renders, just without cycle context
    cli()
        .arg("snapshot")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("AHA peel"))
        .stdout(predicate::str::contains("phase").not());
}

#[test]
fn test_corrupted_weather_file() {
    let (_temp_dir, data_dir) = setup_data_dir();
    fs::write(data_dir.join("weather.json"), "{\"uv_index\": 9, \"humid")
        .expect("Failed to write corrupted weather");

    cli()
        .arg("weather")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("No weather reading stored"));

    cli()
        .arg("snapshot")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"briefing\": null"));
}

#[test]
fn test_profile_overwrites_corrupted_file() {
    let (_temp_dir, data_dir) = setup_data_dir();
    fs::write(data_dir.join("profile.json"), "garbage").unwrap();

    cli()
        .arg("profile")
        .arg("--data-dir")
        .arg(&data_dir)
        .args(["--last-period", "2024-05-01"])
        .assert()
        .success();

    let content = fs::read_to_string(data_dir.join("profile.json")).unwrap();
    let profile: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(profile["last_period_start_date"], "2024-05-01");
    assert_eq!(profile["average_cycle_length"], 28);
}

#[test]
fn test_partial_log_line_is_skipped_on_export() {
    let (_temp_dir, data_dir) = setup_data_dir();

    cli()
        .arg("snapshot")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--log")
        .assert()
        .success();

    // Simulate a crash during the second append
    let log_path = data_dir.join("snapshots.wal");
    let mut file = fs::OpenOptions::new().append(true).open(&log_path).unwrap();
    write!(file, r#"{{"id":"partial"#).unwrap();
    drop(file);

    cli()
        .arg("export")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 2 rows"));
}

#[test]
fn test_corrupted_attachments_file() {
    let (_temp_dir, data_dir) = setup_data_dir();
    fs::write(data_dir.join("attachments.json"), "[{\"routine_id\": ").unwrap();

    cli()
        .arg("snapshot")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success();
}

#[test]
fn test_corrupted_rule_file_falls_back_to_builtin_rules() {
    let (_temp_dir, data_dir) = setup_data_dir();
    let rules_dir = data_dir.join("rules");
    fs::create_dir_all(&rules_dir).unwrap();
    fs::write(rules_dir.join("cycle.json"), "{ not a rule set").unwrap();

    // Snapshot keeps working on the built-in rules
    cli()
        .arg("snapshot")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("AHA peel"))
        .stderr(predicate::str::contains("Rule files ignored"));

    cli()
        .args(["rules", "validate"])
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .failure();
}

#[test]
fn test_malformed_routine_reports_row() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(
        temp_dir.path().join("routine.csv"),
        "id,product_category,time_of_day,order,description\n\
         am-cleanse,cleanser,noon,1,Gel cleanser\n",
    )
    .unwrap();

    cli()
        .arg("snapshot")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("row 2"));
}
