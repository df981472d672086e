//! End-to-end CLI tests for the `lslc` binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn lslc() -> Command {
    Command::cargo_bin("lslc").expect("binary built")
}

#[test]
fn compiles_from_stdin_to_stdout() {
    lslc()
        .arg("-")
        .write_stdin("default { state_entry() { integer i = 2; llOwnerSay((string)i); } }")
        .assert()
        .success()
        .stdout(predicate::str::contains("llOwnerSay(\"2\")"));
}

#[test]
fn compiles_file_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.lsl");
    let output = dir.path().join("out.lsl");
    std::fs::write(&input, "default { timer() { llOwnerSay(\"hi\"); } }").unwrap();

    lslc()
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.contains("llOwnerSay(\"hi\")"));
}

#[test]
fn errors_go_to_stderr_with_position() {
    lslc()
        .arg("-")
        .write_stdin("default { timer() { integer x = \"s\"; } }")
        .assert()
        .failure()
        .stderr(predicate::str::contains("(Line 1 char"))
        .stderr(predicate::str::contains("Type mismatch"));
}

#[test]
fn option_spec_disables_optimization() {
    lslc()
        .args(["-O", "-optimize", "-"])
        .write_stdin("default { timer() { integer i = 2; llOwnerSay((string)i); } }")
        .assert()
        .success()
        .stdout(predicate::str::contains("integer i = 2;"));
}

#[test]
fn bare_mode_rejects_extensions() {
    // Without the default extensions, an extended assignment operator
    // is a syntax error.
    lslc()
        .args(["--bare", "-"])
        .write_stdin("default { timer() { integer i; i |= 2; } }")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Syntax error"));
}

#[test]
fn emap_option_changes_error_format() {
    lslc()
        .args(["-O", "emap", "-"])
        .write_stdin("integer x = ;\ndefault { timer() { } }")
        .assert()
        .failure()
        .stderr(predicate::str::contains("::ERROR::"));
}
