use predicates::prelude::*;

mod common;

#[test]
fn test_inspect_known_volume() {
    let ctx = common::rclonevol();
    ctx.write_state(common::SAMPLE_STATE);

    let output = ctx.new_cmd().args(["inspect", "docs"]).output().unwrap();
    assert!(output.status.success());

    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(records[0]["Name"], "docs");
    assert_eq!(records[0]["Mountpoint"], "/mnt/volumes/4b1c");
    assert_eq!(records[0]["Options"]["bucket"], "docs");
}

#[test]
fn test_inspect_multiple() {
    let ctx = common::rclonevol();
    ctx.write_state(common::SAMPLE_STATE);

    ctx.new_cmd()
        .args(["inspect", "docs", "legacy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"docs\""))
        .stdout(predicate::str::contains("\"legacy\""));
}

#[test]
fn test_inspect_unknown_volume_fails() {
    let ctx = common::rclonevol();
    ctx.write_state(common::SAMPLE_STATE);

    ctx.new_cmd()
        .args(["inspect", "docs", "ghost"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"docs\""))
        .stderr(predicate::str::contains("No such volume: ghost"));
}

#[test]
fn test_inspect_requires_name() {
    let ctx = common::rclonevol();
    ctx.new_cmd().arg("inspect").assert().failure();
}
