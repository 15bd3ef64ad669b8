//! End-to-end tests for the `hs` binary

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn hs(store: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("hs").expect("hs binary should build");
    cmd.arg("--store").arg(store.path());
    cmd
}

#[test]
fn test_write_then_read() {
    let store = TempDir::new().unwrap();

    hs(&store)
        .args(["write", "promptText", r#"{"prompt":"وطن"}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));

    hs(&store)
        .args(["read", "promptText"])
        .assert()
        .success()
        .stdout(predicate::str::contains("وطن"));

    hs(&store)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("promptText"));
}

#[test]
fn test_read_missing_is_pending() {
    let store = TempDir::new().unwrap();

    hs(&store)
        .args(["read", "poemData"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pending or absent"));
}

#[test]
fn test_invalid_payload_fails() {
    let store = TempDir::new().unwrap();

    hs(&store).args(["write", "poemData", "{not json"]).assert().failure();
}

#[test]
fn test_version_counts_writes() {
    let store = TempDir::new().unwrap();

    hs(&store).args(["write", "a", "1"]).assert().success();
    hs(&store).args(["remove", "a"]).assert().success();
    hs(&store)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("2"));
}
