use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("chirp")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("feed"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("--config"));
}

#[test]
fn test_config_help_shows_subcommands() {
    cargo_bin_cmd!("chirp")
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("path"))
        .stdout(predicate::str::contains("init"));
}

#[test]
fn test_unknown_command_fails() {
    cargo_bin_cmd!("chirp")
        .arg("timeline")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}
