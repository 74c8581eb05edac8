#![cfg(feature = "cli")]

use std::io::Write;
use std::process::{Command, Output, Stdio};

fn selector_cmd(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_selector"))
        .args(args)
        .output()
        .expect("Failed to run selector")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim_end().to_string()
}

#[test]
fn test_check_prints_canonical_form() {
    let output = selector_cmd(&["check", "a=1 and (b='x' or c is null)"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "a = 1 AND (b = 'x' OR c IS NULL)");
}

#[test]
fn test_check_reports_syntax_errors() {
    let output = selector_cmd(&["check", "a = 1 AND"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(
        !output.stderr.is_empty(),
        "expected a diagnostic on stderr"
    );
}

#[test]
fn test_keys() {
    let output = selector_cmd(&["keys", "a = 1 AND b IN ('x', 'y') AND c > 5"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "a in {1}\nb in {'x', 'y'}");

    let output = selector_cmd(&["keys", "a = 1 OR b = 2"]);
    assert_eq!(stdout(&output), "(not indexable)");

    let output = selector_cmd(&["keys", ""]);
    assert_eq!(stdout(&output), "(no selector: matches every message)");
}

#[test]
fn test_keys_json() {
    let output = selector_cmd(&["keys", "--json", "color IN ('red', 'red')"]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "keys": [{ "property_name": "color", "candidate_values": ["red"] }]
        })
    );
}

#[test]
fn test_eval_exit_codes() {
    let output = selector_cmd(&["eval", "weight > 2 AND color = 'red'", "-p", "weight=3", "-p", "color=red"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "true");

    let output = selector_cmd(&["eval", "weight > 2", "-p", "weight=1"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout(&output), "false");

    let output = selector_cmd(&["eval", "weight > 2"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout(&output), "unknown");
}

#[test]
fn test_eval_headers() {
    let output = selector_cmd(&[
        "eval",
        "JMSType = 'car' AND JMSPriority = 7 AND JMSDeliveryMode = 'NON_PERSISTENT' AND JMSTimestamp = 0",
        "--type",
        "car",
        "--priority",
        "7",
        "--delivery-mode",
        "non-persistent",
        "--timestamp",
        "1970-01-01T00:00:00Z",
    ]);
    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));

    let output = selector_cmd(&["eval", "a = 1", "--priority", "12"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_eval_json_from_stdin() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_selector"))
        .args(["eval", "size BETWEEN 1 AND 10 AND name LIKE 'f%' AND flag", "--json", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start selector");

    child
        .stdin
        .take()
        .expect("Failed to get stdin")
        .write_all(br#"{"size": 4.5, "name": "foo", "flag": true, "ignored": null}"#)
        .expect("Failed to write properties");

    let output = child.wait_with_output().expect("Failed to wait for selector");
    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));
}

#[test]
fn test_eval_rejects_nested_json() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_selector"))
        .args(["eval", "a = 1", "--json", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start selector");

    child
        .stdin
        .take()
        .expect("Failed to get stdin")
        .write_all(br#"{"a": [1]}"#)
        .expect("Failed to write properties");

    let output = child.wait_with_output().expect("Failed to wait for selector");
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("only scalar values"));
}
