//! CLI integration tests for mssql-sync.
//!
//! These tests verify command-line argument parsing, help output,
//! and exit codes for various error conditions.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the mssql-sync binary.
fn cmd() -> Command {
    Command::cargo_bin("mssql-sync").unwrap()
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("compare"))
        .stdout(predicate::str::contains("scripts"))
        .stdout(predicate::str::contains("sync"));
}

#[test]
fn test_help_shows_global_flags() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--output-json"))
        .stdout(predicate::str::contains("--verbosity"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mssql-sync"));
}

#[test]
fn test_no_subcommand_fails() {
    cmd().assert().failure();
}

// =============================================================================
// Configuration Error Tests
// =============================================================================

#[test]
fn test_missing_config_file() {
    cmd()
        .args(["--config", "/nonexistent/config.yaml", "compare"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_invalid_yaml_config() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "source: [not, a, mapping]").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "compare"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_config_missing_required_fields() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
source:
  host: ""
  database: db1
  user: sa
  password: pw
target:
  host: tgt
  database: db2
  user: sa
  password: pw
"#
    )
    .unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "compare"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("source.host"));
}

#[test]
fn test_same_database_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
source:
  host: same-host
  database: same-db
  user: sa
  password: pw
target:
  host: same-host
  database: same-db
  user: sa
  password: pw
"#
    )
    .unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "compare"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("same database"));
}

#[test]
fn test_unknown_engine_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
source:
  engine: sqlite
  host: a
  database: d1
  user: sa
  password: pw
target:
  engine: sqlite
  host: b
  database: d2
  user: sa
  password: pw
"#
    )
    .unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "compare"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sqlite"));
}

#[test]
fn test_rust_log_overrides_verbosity() {
    // A RUST_LOG directive must be accepted by the logging setup; the run
    // still fails later on the missing config file.
    cmd()
        .env("RUST_LOG", "mssql_sync=debug")
        .args(["--config", "/nonexistent/config.yaml", "compare"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_invalid_verbosity_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "source: {{}}").unwrap();

    cmd()
        .args([
            "--config",
            file.path().to_str().unwrap(),
            "--verbosity",
            "loud",
            "compare",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("verbosity"));
}
