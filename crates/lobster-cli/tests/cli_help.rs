use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    let output = cargo_bin_cmd!("lobster").arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    for command in [
        "register", "auth", "status", "stalls", "quests", "submit", "improve", "wallet", "task",
        "craft", "upgrade", "economy", "connect", "work", "check", "move", "celebrate", "verify",
    ] {
        assert!(stdout.contains(command), "missing {command} in:\n{stdout}");
    }
}

#[test]
fn test_verify_help_shows_subcommands() {
    cargo_bin_cmd!("lobster")
        .args(["verify", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("accept"))
        .stdout(predicate::str::contains("stamp"));
}

#[test]
fn test_task_rejects_unknown_task() {
    cargo_bin_cmd!("lobster")
        .args(["task", "sweep_floor"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("daily_checkin"));
}

#[test]
fn test_upgrade_rejects_unknown_tier() {
    cargo_bin_cmd!("lobster")
        .args(["upgrade", "WIZARD"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("JOURNEYMAN"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("lobster")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
