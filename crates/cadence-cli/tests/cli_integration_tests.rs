use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use uuid::Uuid;

fn cadence(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cadence").expect("binary builds");
    cmd.env("CADENCE_DATABASE_PATH", temp.path().join("cli.db"));
    cmd.current_dir(temp.path());
    cmd
}

#[test]
fn help_lists_the_command_tree() {
    let temp = tempfile::tempdir().unwrap();
    cadence(&temp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("refresh"))
        .stdout(predicate::str::contains("occurrences"));
}

#[test]
fn add_then_query_occurrences() {
    let temp = tempfile::tempdir().unwrap();
    let element = Uuid::now_v7().to_string();
    let field = Uuid::now_v7().to_string();

    cadence(&temp)
        .args([
            "add",
            &element,
            "--field",
            &field,
            "--start",
            "2030-01-07 09:00",
            "--end",
            "2030-01-07 10:00",
            "--timezone",
            "UTC",
            "--recurrence",
            "FREQ=WEEKLY;COUNT=3",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created date"))
        .stdout(predicate::str::contains("Cached 3 occurrences."));

    cadence(&temp)
        .args(["occurrences", &element, "--field", &field])
        .assert()
        .success()
        .stdout(predicate::str::contains("2030-01-07 09:00"))
        .stdout(predicate::str::contains("2030-01-21 09:00"));

    cadence(&temp)
        .args(["next", &element, "--field", &field])
        .assert()
        .success()
        .stdout(predicate::str::contains("2030-01-07 09:00"));
}

#[test]
fn refresh_reports_a_summary() {
    let temp = tempfile::tempdir().unwrap();
    cadence(&temp)
        .arg("refresh")
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed 0 records"));
}

#[test]
fn preview_expands_without_persisting() {
    let temp = tempfile::tempdir().unwrap();
    cadence(&temp)
        .args([
            "preview",
            "FREQ=DAILY;COUNT=5",
            "--start",
            "2030-06-01 09:00",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("2030-06-02 09:00"))
        .stdout(predicate::str::contains("2030-06-05 09:00"));
}

#[test]
fn malformed_rule_is_a_visible_error() {
    let temp = tempfile::tempdir().unwrap();
    let element = Uuid::now_v7().to_string();
    let field = Uuid::now_v7().to_string();

    cadence(&temp)
        .args([
            "add",
            &element,
            "--field",
            &field,
            "--start",
            "2030-01-07 09:00",
            "--recurrence",
            "COUNT=3",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid recurrence rule"));
}
