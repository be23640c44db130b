//! End-to-end tests for the `validate` and `format` commands.
//!
//! These tests invoke the actual CLI binary against temporary directories
//! and check its behavior from a user's perspective.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_fs::prelude::*;
use predicates::prelude::*;

const BUF_YAML: &str = "version: v2
modules:
- path: proto/b
- path: proto/a
lint:
  use: [BASIC]
";

const BUF_GEN_V1: &str = "version: v1
plugins:
- plugin: go
  out: gen/go
";

#[test]
fn test_validate_reports_every_file() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("buf.yaml").write_str(BUF_YAML).unwrap();
    temp.child("buf.gen.yaml").write_str(BUF_GEN_V1).unwrap();

    cargo_bin_cmd!("bufconfig")
        .arg("validate")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("buf.yaml: ok (v2, 2 modules)"))
        .stdout(predicate::str::contains("buf.gen.yaml: ok (v1, 1 plugin)"));
}

#[test]
fn test_validate_fails_on_invalid_file() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("buf.yaml").write_str(BUF_YAML).unwrap();
    temp.child("buf.work.yaml")
        .write_str("version: v1\ndirectories: [proto, proto/a]\n")
        .unwrap();

    cargo_bin_cmd!("bufconfig")
        .arg("validate")
        .arg(temp.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("buf.yaml: ok"))
        .stdout(predicate::str::contains("contains directory"))
        .stderr(predicate::str::contains("1 of 2 configuration files are invalid"));
}

#[test]
fn test_validate_empty_directory() {
    let temp = assert_fs::TempDir::new().unwrap();

    cargo_bin_cmd!("bufconfig")
        .current_dir(temp.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no configuration files found"));
}

#[test]
fn test_format_prints_canonical_form() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("buf.yaml").write_str(BUF_YAML).unwrap();

    cargo_bin_cmd!("bufconfig")
        .arg("format")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "version: v2\nmodules:\n- path: proto/a\n- path: proto/b\nlint:\n  use:\n  - BASIC\n",
        ));

    temp.child("buf.yaml").assert(BUF_YAML);
}

#[test]
fn test_format_write_migrates_generation_file() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("buf.gen.yaml").write_str(BUF_GEN_V1).unwrap();

    cargo_bin_cmd!("bufconfig")
        .arg("format")
        .arg("--write")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("formatted"))
        .stderr(predicate::str::contains("written as v2"));

    temp.child("buf.gen.yaml")
        .assert(predicate::str::contains("version: v2\n"))
        .assert(predicate::str::contains("local: protoc-gen-go"));
}

#[test]
fn test_format_write_replaces_legacy_name() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("buf.work")
        .write_str("version: v1\ndirectories: [b, a]\n")
        .unwrap();

    cargo_bin_cmd!("bufconfig")
        .arg("format")
        .arg("--write")
        .arg(temp.path())
        .assert()
        .success();

    temp.child("buf.work").assert(predicate::path::missing());
    temp.child("buf.work.yaml")
        .assert(predicate::str::contains("directories:\n- a\n- b\n"));
}

#[test]
fn test_format_refuses_invalid_files() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("buf.yaml").write_str("version: v2\nlnt: {}\n").unwrap();

    cargo_bin_cmd!("bufconfig")
        .arg("format")
        .arg("--write")
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot format buf.yaml"));

    temp.child("buf.yaml").assert("version: v2\nlnt: {}\n");
}

#[test]
fn test_log_level_flag_enables_debug_output() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("buf.yaml").write_str(BUF_YAML).unwrap();

    cargo_bin_cmd!("bufconfig")
        .env_remove("RUST_LOG")
        .arg("--log-level")
        .arg("debug")
        .arg("validate")
        .arg(temp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("reading buf.yaml as version v2"));
}
