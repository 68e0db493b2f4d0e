use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

const MORNING: &str = "2026-02-07T06:00:00";
const MORNING_ID: &str = "1770444000000";

fn clockdeck(data: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("clockdeck");
    cmd.env("TZ", "UTC").arg("--data").arg(data);
    cmd
}

#[test]
fn added_alarm_is_listed_with_countdown() {
    let dir = tempdir().expect("tempdir");
    let data = dir.path().join("clockdeck.json");

    clockdeck(&data)
        .args(["--at", MORNING, "alarm", "add", "--time", "7:30"])
        .args(["--label", "Gym", "--sound", "bell", "--volume", "0.5"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "added 07:30 - Gym ({MORNING_ID})"
        )));

    clockdeck(&data)
        .args(["--at", MORNING, "alarm", "list"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("07:30")
                .and(predicate::str::contains("bell"))
                .and(predicate::str::contains("50%"))
                .and(predicate::str::contains("in 1h 30m"))
                .and(predicate::str::contains("Gym")),
        );

    let stored = fs::read_to_string(&data).expect("data file written");
    assert!(stored.contains("alarms"));
    assert!(stored.contains("isActive"));
}

#[test]
fn toggle_and_delete_persist_between_runs() {
    let dir = tempdir().expect("tempdir");
    let data = dir.path().join("clockdeck.json");

    clockdeck(&data)
        .args(["--at", MORNING, "alarm", "add", "--time", "07:30"])
        .assert()
        .success();
    clockdeck(&data)
        .args(["alarm", "toggle", MORNING_ID])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("{MORNING_ID} off")));
    clockdeck(&data)
        .args(["--at", MORNING, "alarm", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(" off "));
    clockdeck(&data)
        .args(["alarm", "delete", MORNING_ID])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("deleted {MORNING_ID}")));
    clockdeck(&data)
        .args(["alarm", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No alarms."));
}

#[test]
fn unknown_alarm_ids_are_reported_not_failed() {
    let dir = tempdir().expect("tempdir");
    let data = dir.path().join("clockdeck.json");

    clockdeck(&data)
        .args(["alarm", "toggle", "42"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no alarm 42"));
    clockdeck(&data)
        .args(["alarm", "delete", "42"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no alarm 42"));
    assert!(!data.exists());
}

#[test]
fn alarm_without_valid_time_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let data = dir.path().join("clockdeck.json");

    clockdeck(&data)
        .args(["alarm", "add", "--label", "No time"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("please select a time"));
    clockdeck(&data)
        .args(["alarm", "add", "--time", "25:00"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid time '25:00'"));
    assert!(!data.exists());
}

#[test]
fn malformed_json_fails_with_clear_error() {
    let dir = tempdir().expect("tempdir");
    let data = dir.path().join("clockdeck.json");
    fs::write(&data, "{ not-valid-json ").expect("write invalid json");

    clockdeck(&data)
        .args(["alarm", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid JSON"));
}

#[test]
fn world_cities_are_added_listed_and_removed() {
    let dir = tempdir().expect("tempdir");
    let data = dir.path().join("clockdeck.json");

    clockdeck(&data)
        .args(["world", "add", "Tokyo,+9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("added Tokyo (UTC+9)"));
    clockdeck(&data)
        .args(["world", "add", "Tokyo,+9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already listed"));
    clockdeck(&data)
        .args(["world", "add", "Atlantis,+20"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("City,Offset"));
    clockdeck(&data)
        .args(["--at", MORNING, "world", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tokyo").and(predicate::str::contains("03:00:00 PM")));
    clockdeck(&data)
        .args(["world", "remove", "Tokyo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("removed Tokyo"));
    clockdeck(&data)
        .args(["world", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No cities."));
}

#[test]
fn clock_prints_twelve_hour_time_and_hands() {
    let dir = tempdir().expect("tempdir");
    let data = dir.path().join("clockdeck.json");

    clockdeck(&data)
        .args(["--at", "2026-02-07T15:45:30", "clock", "--seconds"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("03:45:30 PM")
                .and(predicate::str::contains("hour 112.5 minute 270.0 second 180.0"))
                .and(predicate::str::contains("No cities.")),
        );
}

#[test]
fn timer_counts_down_and_rejects_zero() {
    let dir = tempdir().expect("tempdir");
    let data = dir.path().join("clockdeck.json");

    clockdeck(&data)
        .args(["timer", "0", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("please enter a valid time"));
    let started = Instant::now();
    clockdeck(&data)
        .args(["timer", "", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("00:01").and(predicate::str::contains("time's up")));
    assert!(started.elapsed() >= Duration::from_secs(1));
}

#[test]
fn stopwatch_records_requested_laps() {
    let dir = tempdir().expect("tempdir");
    let data = dir.path().join("clockdeck.json");

    clockdeck(&data)
        .args(["stopwatch", "--laps", "2", "--interval-ms", "10"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("lap 1: ")
                .and(predicate::str::contains("lap 2: "))
                .and(predicate::str::contains("over 2 laps")),
        );
    clockdeck(&data)
        .args(["stopwatch", "--laps", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--laps must be greater than zero"));
}

#[test]
fn run_takes_commands_from_stdin() {
    let dir = tempdir().expect("tempdir");
    let data = dir.path().join("clockdeck.json");

    clockdeck(&data)
        .args(["--ephemeral", "--at", MORNING, "run"])
        .write_stdin("add 07:30 Gym\nlist\nsnooze\nbogus\nq\n")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("added 07:30 - Gym")
                .and(predicate::str::contains("in 1h 30m"))
                .and(predicate::str::contains("nothing is ringing"))
                .and(predicate::str::contains("unknown command 'bogus'")),
        );
    assert!(!data.exists());
}

#[test]
fn run_exits_when_input_closes() {
    let dir = tempdir().expect("tempdir");
    let data = dir.path().join("clockdeck.json");

    clockdeck(&data)
        .args(["--at", MORNING, "run"])
        .write_stdin("add 08:00 Standup\n")
        .assert()
        .success();
    clockdeck(&data)
        .args(["--at", MORNING, "alarm", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Standup"));
}
