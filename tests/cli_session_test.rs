//! Integration tests for `termkeep session` commands.

mod common;

use common::TestEnv;
use predicates::prelude::*;

#[test]
fn test_list_empty() {
    let env = TestEnv::new();
    let json = env.json(&["session", "list"]);
    assert_eq!(json["count"], 0);
    assert_eq!(json["sessions"], serde_json::json!([]));
}

#[test]
fn test_set_then_show() {
    let env = TestEnv::new();
    env.tk()
        .args(["session", "set", "prod box", "HostName=prod.example.org", "PortNumber=2222"])
        .assert()
        .success();

    assert_eq!(
        env.read_file("sessions/prod%20box"),
        b"HostName=prod.example.org\nPortNumber=2222\n"
    );

    let json = env.json(&["session", "show", "prod box"]);
    assert_eq!(json["exists"], true);
    assert_eq!(json["settings"][0]["key"], "HostName");
    assert_eq!(json["settings"][1]["value"], "2222");
}

#[test]
fn test_show_default_session() {
    let env = TestEnv::new();
    env.write_file("sessions/Default%20Settings", b"TerminalType=xterm\n");
    env.tk()
        .args(["-H", "session", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Session: Default Settings"))
        .stdout(predicate::str::contains("TerminalType = xterm"));
}

#[test]
fn test_show_missing_session() {
    let env = TestEnv::new();
    let json = env.json(&["session", "show", "ghost"]);
    assert_eq!(json["exists"], false);
}

#[test]
fn test_get_first_occurrence_wins() {
    let env = TestEnv::new();
    env.write_file("sessions/s", b"k=1\nk=2\n");
    let json = env.json(&["session", "get", "s", "k"]);
    assert_eq!(json["value"], "1");
    assert_eq!(json["source"], "session");
}

#[test]
fn test_get_layering() {
    let env = TestEnv::new();
    env.write_file("sessions/s", b"Font=session-font\n");
    let resources = env.data_dir.path().join("resources");
    std::fs::write(&resources, "! defaults\ntermkeep.Rows: 30\ntermkeep*Cols: 100\n").unwrap();

    let font = env.json(&["session", "get", "s", "Font", "-r", "x.Font: resource-font"]);
    assert_eq!(font["value"], "session-font");

    let rows = env.json(&[
        "session",
        "get",
        "s",
        "Rows",
        "--resource-file",
        resources.to_str().unwrap(),
        "-r",
        "x.Rows: 40",
    ]);
    assert_eq!(rows["value"], "40");
    assert_eq!(rows["source"], "resource");

    let cols = env.json(&[
        "session",
        "get",
        "s",
        "Cols",
        "--resource-file",
        resources.to_str().unwrap(),
    ]);
    assert_eq!(cols["value"], "100");
}

#[test]
fn test_get_env_default() {
    let env = TestEnv::new();
    let output = env
        .tk()
        .env("TERMKEEP_DEFAULT_SCROLLBACKLINES", "9000")
        .args(["session", "get", "absent", "ScrollbackLines"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["value"], "9000");
    assert_eq!(json["source"], "default");
}

#[test]
fn test_get_unset() {
    let env = TestEnv::new();
    let json = env.json(&["session", "get", "s", "Nothing"]);
    assert!(json["value"].is_null());
    assert!(json["source"].is_null());
}

#[test]
fn test_malformed_resource_is_a_warning() {
    let env = TestEnv::new();
    env.tk()
        .args(["session", "get", "s", "k", "-r", "no colon", "-r", "x.k: v"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""value":"v""#))
        .stderr(predicate::str::contains("Expected a colon"));
}

#[test]
fn test_set_rejects_bad_assignment() {
    let env = TestEnv::new();
    env.tk()
        .args(["session", "set", "s", "missing-equals"])
        .assert()
        .code(1);
    assert!(!env.root().join("sessions").join("s").exists());
}

#[test]
fn test_list_only_regular_files() {
    let env = TestEnv::new();
    env.tk().args(["session", "set", "b", "k=v"]).assert().success();
    env.tk().args(["session", "set", "a/c", "k=v"]).assert().success();
    std::fs::create_dir(env.root().join("sessions").join("nested")).unwrap();

    let json = env.json(&["session", "list"]);
    assert_eq!(json["sessions"], serde_json::json!(["a/c", "b"]));
}

#[test]
fn test_delete() {
    let env = TestEnv::new();
    env.tk().args(["session", "set", "s", "k=v"]).assert().success();

    let json = env.json(&["session", "delete", "s"]);
    assert_eq!(json["deleted"], true);
    let json = env.json(&["session", "delete", "s"]);
    assert_eq!(json["deleted"], false);
    assert_eq!(env.json(&["session", "list"])["count"], 0);
}

#[test]
fn test_encode_decode() {
    let env = TestEnv::new();
    let json = env.json(&["session", "encode", "user@host:22"]);
    assert_eq!(json["token"], "user@host%3A22");
    let json = env.json(&["session", "decode", "user@host%3A22"]);
    assert_eq!(json["session"], "user@host:22");
    let json = env.json(&["session", "encode"]);
    assert_eq!(json["token"], "Default%20Settings");
}
