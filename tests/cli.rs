use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn sprig_eval_prints_result() {
    let mut cmd = Command::cargo_bin("sprig").expect("binary exists");
    cmd.arg("eval").arg("a = 2; b = 3; return a + b;");
    cmd.assert().success().stdout(predicate::str::contains("5"));
}

#[test]
fn sprig_eval_reports_undefined_method() {
    let mut cmd = Command::cargo_bin("sprig").expect("binary exists");
    cmd.arg("eval").arg("foo();");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Evaluation error").and(predicate::str::contains("foo")));
}

#[test]
fn sprig_run_demo_script() {
    let mut cmd = Command::cargo_bin("sprig").expect("binary exists");
    cmd.arg("run").arg("demos/counter.sprig");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("total: 16"))
        .stdout(predicate::str::contains("squares: 1 4 9 16"))
        .stdout(predicate::str::contains("max is 7"));
}

#[test]
fn sprig_run_reports_host_failures() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("parse.sprig");
    fs::write(
        &script,
        "print(Integer.parseInt(\"12\"));\nInteger.parseInt(\"zz\");\n",
    )
    .expect("write script");

    let mut cmd = Command::cargo_bin("sprig").expect("binary exists");
    cmd.arg("run").arg(&script);
    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("12"))
        .stderr(predicate::str::contains("Target error").and(predicate::str::contains("parse.sprig")));
}

#[test]
fn sprig_run_missing_script_fails() {
    let dir = tempdir().expect("create temp dir");
    let mut cmd = Command::cargo_bin("sprig").expect("binary exists");
    cmd.arg("run").arg(dir.path().join("absent.sprig"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("absent.sprig"));
}
