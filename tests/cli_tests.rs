//! CLI tests for the vigia binary
#![allow(deprecated)] // suppress assert_cmd::Command::cargo_bin deprecation in tests

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn vigia() -> Command {
    Command::cargo_bin("vigia").unwrap()
}

#[test]
fn test_config_defaults() {
    let dir = TempDir::new().unwrap();
    vigia()
        .arg("config")
        .arg("--config-dir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"summary\": true"))
        .stdout(predicate::str::contains("\"frequency\": false"))
        .stdout(predicate::str::contains("\"child_process\""));
}

#[test]
fn test_config_file_discovered_and_overridden() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("vigia.toml"),
        "frequency = true\nmodules = [\"fs\", \"require\"]\n",
    )
    .unwrap();

    vigia()
        .args(["config", "--config-dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"frequency\": true"))
        .stdout(predicate::str::contains("\"http\"").not());

    // Command-line expression wins over the file
    vigia()
        .args(["config", "-e", "modules=network", "--config-dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"https\""))
        .stdout(predicate::str::contains("\"require\"").not());
}

#[test]
fn test_invalid_config_file_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("vigia.toml"), "modules = [\"smtp\"]\n").unwrap();

    vigia()
        .args(["config", "--config-dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown module 'smtp'"));
}

#[test]
fn test_invalid_expression_rejected() {
    vigia()
        .args(["config", "-e", "trace=open"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid filter expression"));
}

#[test]
fn test_operations_follow_filter() {
    let dir = TempDir::new().unwrap();
    vigia()
        .args(["operations", "-e", "modules=child_process,require", "--config-dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("child_process.spawn"))
        .stdout(predicate::str::contains("require"))
        .stdout(predicate::str::contains("fs.read").not());
}

#[test]
fn test_resolve_builtin() {
    vigia()
        .args(["resolve", "fs", "--from", "/app/main.js"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"builtin\""))
        .stdout(predicate::str::contains("\"identity\": \"fs\""));
}

#[test]
fn test_resolve_package_from_nested_requester() {
    let dir = TempDir::new().unwrap();
    let pkg = dir.path().join("node_modules").join("chalk");
    fs::create_dir_all(&pkg).unwrap();
    fs::write(pkg.join("index.js"), "").unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();

    vigia()
        .arg("resolve")
        .arg("chalk")
        .arg("--from")
        .arg(dir.path().join("src").join("app.js"))
        .arg("--entry")
        .arg(dir.path().join("src").join("main.js"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"package\""))
        .stdout(predicate::str::contains("chalk"));
}

#[test]
fn test_resolve_missing_package_fails() {
    let dir = TempDir::new().unwrap();
    vigia()
        .arg("resolve")
        .arg("left-pad")
        .arg("--from")
        .arg(dir.path().join("main.js"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot resolve 'left-pad'"));
}

#[cfg(unix)]
#[test]
fn test_exec_writes_summary_file() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("summary.log");
    vigia()
        .args(["exec", "--config-dir"])
        .arg(dir.path())
        .arg("-o")
        .arg(&out)
        .args(["--", "echo", "watched"])
        .assert()
        .success()
        .stdout(predicate::str::contains("watched"));

    let content = fs::read_to_string(&out).unwrap();
    assert!(content.contains("echo watched"), "{}", content);
    assert!(content.ends_with("\r\n"));
}

#[cfg(unix)]
#[test]
fn test_exec_live_mode_logs_spawn() {
    let dir = TempDir::new().unwrap();
    vigia()
        .args(["exec", "--no-summary", "--structured", "--config-dir"])
        .arg(dir.path())
        .args(["--", "true"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"message\": \"child_process.spawn | true\""));
}

#[cfg(unix)]
#[test]
fn test_exec_propagates_exit_code() {
    let dir = TempDir::new().unwrap();
    vigia()
        .args(["exec", "--config-dir"])
        .arg(dir.path())
        .args(["--", "sh", "-c", "exit 3"])
        .assert()
        .code(3);
}

#[test]
fn test_exec_missing_program_fails() {
    let dir = TempDir::new().unwrap();
    vigia()
        .args(["exec", "--config-dir"])
        .arg(dir.path())
        .args(["--", "vigia-no-such-program"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to start"));
}
