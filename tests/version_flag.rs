use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn prints_version() {
    Command::cargo_bin("skillhub-tui")
        .expect("binary built")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn login_without_user_id_is_a_usage_error() {
    Command::cargo_bin("skillhub-tui")
        .expect("binary built")
        .arg("--login")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage: skillhub-tui --login"));
}

#[test]
fn prints_help() {
    Command::cargo_bin("skillhub-tui")
        .expect("binary built")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("skillhub-tui").and(predicate::str::contains("--version")));
}
