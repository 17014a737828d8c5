use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_tempfile(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create tempfile");
    write!(file, "{contents}").expect("write tempfile");
    file
}

fn treesync() -> Command {
    let mut cmd = Command::cargo_bin("treesync").expect("binary treesync should be built");
    cmd.env_remove("TREESYNC_LOG");
    cmd
}

#[test]
fn help_succeeds() {
    treesync()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("diff"))
        .stdout(predicate::str::contains("patch"));
}

#[test]
fn version_banner_names_the_binary() {
    treesync().arg("--version").assert().success().stdout(predicate::str::starts_with("treesync "));
}

#[test]
fn diff_prints_change_tuples() {
    let old = write_tempfile(r#"{"foo":1,"bar":[1]}"#);
    let new = write_tempfile(r#"{"foo":2,"bar":[1]}"#);

    treesync()
        .arg("diff")
        .arg(old.path())
        .arg(new.path())
        .assert()
        .code(1)
        .stdout("[[\"pending\",\"bar\",null],[\"update\",\"foo\",2]]\n")
        .stderr(predicate::str::is_empty());
}

#[test]
fn diff_of_equal_scalars_exits_zero() {
    let old = write_tempfile(r#"{"a":1}"#);
    let new = write_tempfile(r#"{"a":1}"#);

    treesync()
        .arg("diff")
        .arg(old.path())
        .arg(new.path())
        .assert()
        .code(0)
        .stdout("[[\"none\",\"a\",1]]\n");
}

#[test]
fn diff_of_identical_nested_documents_exits_zero() {
    let old = write_tempfile(r#"{"a":{"b":1},"list":[[1],{"c":true}]}"#);
    let new = write_tempfile(r#"{"a":{"b":1},"list":[[1],{"c":true}]}"#);

    treesync()
        .arg("diff")
        .arg(old.path())
        .arg(new.path())
        .assert()
        .code(0)
        .stdout("[[\"pending\",\"a\",null],[\"pending\",\"list\",null]]\n");
}

#[test]
fn diff_of_nested_change_exits_one() {
    let old = write_tempfile(r#"{"a":{"b":1}}"#);
    let new = write_tempfile(r#"{"a":{"b":2}}"#);

    treesync()
        .arg("diff")
        .arg(old.path())
        .arg(new.path())
        .assert()
        .code(1)
        .stdout("[[\"pending\",\"a\",null]]\n");
}

#[test]
fn diff_single_argument_reads_stdin() {
    let old = write_tempfile("[1]");

    treesync()
        .arg("diff")
        .arg(old.path())
        .write_stdin("[2]")
        .assert()
        .code(1)
        .stdout("[[\"delete\",0,null],[\"add\",0,2]]\n");
}

#[test]
fn diff_rejects_scalar_roots() {
    let old = write_tempfile("1");
    let new = write_tempfile("2");

    treesync()
        .arg("diff")
        .arg(old.path())
        .arg(new.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot diff scalar against scalar"));
}

#[test]
fn patch_tree_prints_the_patched_document() {
    let old = write_tempfile(r#"{"foo":[1,3,3]}"#);
    let new = write_tempfile(r#"{"foo":[1,2,3]}"#);

    treesync()
        .arg("patch")
        .arg(old.path())
        .arg(new.path())
        .assert()
        .success()
        .stdout("{\"foo\":[1,2,3]}\n");
}

#[test]
fn patch_store_prints_the_patched_document() {
    let old = write_tempfile(r#"{"foo":{"bar":1},"keep":true}"#);
    let new = write_tempfile(r#"{"foo":{},"keep":true}"#);

    treesync()
        .args(["patch", "--target", "store"])
        .arg(old.path())
        .arg(new.path())
        .assert()
        .success()
        .stdout("{\"foo\":{},\"keep\":true}\n");
}

#[test]
fn patch_reads_and_writes_yaml() {
    let old = write_tempfile("foo: 1\n");
    let new = write_tempfile("foo: 2\n");

    treesync()
        .args(["patch", "--yaml"])
        .arg(old.path())
        .arg(new.path())
        .assert()
        .success()
        .stdout("foo: 2\n");
}

#[test]
fn patch_writes_output_file() {
    let old = write_tempfile("[]");
    let new = write_tempfile("[true]");
    let out = NamedTempFile::new().expect("create output tempfile");

    treesync()
        .arg("patch")
        .arg(old.path())
        .arg(new.path())
        .arg("-o")
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let written = fs::read_to_string(out.path()).expect("output readable");
    assert_eq!(written, "[true]\n");
}

#[test]
fn patch_shape_mismatch_exits_two() {
    let old = write_tempfile("{}");
    let new = write_tempfile("[]");

    treesync()
        .arg("patch")
        .arg(old.path())
        .arg(new.path())
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("failed to patch shared tree"))
        .stderr(predicate::str::contains("cannot apply sequence changes to mapping target at /"));
}

#[test]
fn patch_rejects_zero_depth() {
    let old = write_tempfile("{}");
    let new = write_tempfile("{}");

    treesync()
        .args(["patch", "--max-depth", "0"])
        .arg(old.path())
        .arg(new.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("max depth must be at least 1"));
}

#[test]
fn verbose_patch_logs_stats_to_stderr() {
    let old = write_tempfile(r#"{"a":1}"#);
    let new = write_tempfile(r#"{"a":2}"#);

    treesync()
        .args(["-v", "patch"])
        .arg(old.path())
        .arg(new.path())
        .assert()
        .success()
        .stdout("{\"a\":2}\n")
        .stderr(predicate::str::contains("patch applied"));
}

#[test]
fn json_logs_are_structured() {
    let old = write_tempfile(r#"{"a":1}"#);
    let new = write_tempfile(r#"{"a":2}"#);

    let output = treesync()
        .args(["-v", "--log-json", "patch", "--target", "store"])
        .arg(old.path())
        .arg(new.path())
        .output()
        .expect("run treesync");
    assert!(output.status.success());

    let stderr = String::from_utf8(output.stderr).expect("utf-8 logs");
    let line = stderr
        .lines()
        .find(|line| line.contains("patch applied"))
        .expect("stats line should be logged");
    let record: serde_json::Value = serde_json::from_str(line).expect("log line is JSON");
    assert_eq!(record["fields"]["updated"], 1);
}
