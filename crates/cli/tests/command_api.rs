use assert_cmd::Command;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

#[allow(deprecated)]
fn run_command(workdir: &Path, request: &str) -> (bool, Value) {
    let output = Command::cargo_bin("funding-allocator")
        .expect("binary")
        .current_dir(workdir)
        .env_remove("FUNDING_ALLOCATOR_CONFIG")
        .env_remove("FUNDING_RATE_MAX")
        .env_remove("FUNDING_OUTPUT_DIR")
        .arg("command")
        .arg("--json")
        .arg(request)
        .output()
        .expect("command run");

    let body: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    (output.status.success(), body)
}

#[test]
fn capabilities_advertise_actions() {
    let temp = tempdir().unwrap();
    let (ok, body) = run_command(temp.path(), r#"{"action":"capabilities"}"#);

    assert!(ok);
    assert_eq!(body["data"]["server"]["name"], "funding-allocator");
    assert_eq!(
        body["data"]["actions"],
        json!(["allocate", "validate", "capabilities"])
    );
    assert_eq!(body["data"]["defaults"]["rate_max"], 4000.0);
}

#[test]
fn allocate_through_command_api() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    fs::write(
        root.join("centers.csv"),
        "people_served,incentive,per_center_cap\n100,0,2500\n100,1,\n40,0,0\n",
    )
    .unwrap();

    let request = json!({
        "action": "allocate",
        "payload": {
            "input": "centers.csv",
            "total_funding": 4500.0,
            "base_funding": 100.0,
            "unincorporated_funding": 200.0,
            "output": "allocated.csv"
        }
    });
    let (ok, body) = run_command(root, &request.to_string());

    assert!(ok, "unexpected failure: {body}");
    let disbursed = body["data"]["disbursed"].as_f64().unwrap();
    assert!((disbursed - 4500.0).abs() <= 0.01, "disbursed = {disbursed}");
    assert_eq!(body["data"]["centers"].as_array().unwrap().len(), 3);
    assert!(root.join("allocated.csv").is_file());
}

#[test]
#[allow(deprecated)]
fn command_stdin_is_supported() {
    let temp = tempdir().unwrap();
    let output = Command::cargo_bin("funding-allocator")
        .expect("binary")
        .current_dir(temp.path())
        .env_remove("FUNDING_ALLOCATOR_CONFIG")
        .arg("command")
        .write_stdin(r#"{"action":"capabilities"}"#)
        .output()
        .expect("command run");

    assert!(output.status.success());
    let body: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["status"], "ok");
}

#[test]
fn malformed_request_is_invalid_parameter() {
    let temp = tempdir().unwrap();
    let (ok, body) = run_command(temp.path(), r#"{"action":"optimize"}"#);

    assert!(!ok);
    assert_eq!(body["error"]["code"], "invalid_parameter");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Invalid JSON passed to --json/--file"));
}

#[test]
fn empty_table_is_reported() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    fs::write(root.join("empty.csv"), "people_served,incentive\n").unwrap();

    let (ok, body) = run_command(
        root,
        r#"{"action":"validate","payload":{"input":"empty.csv"}}"#,
    );

    assert!(!ok);
    assert_eq!(body["error"]["code"], "empty_input");
    assert_eq!(body["hints"][0]["type"], "action");
}

#[test]
#[allow(deprecated)]
fn schema_describes_response_envelope() {
    let output = Command::cargo_bin("funding-allocator")
        .expect("binary")
        .arg("schema")
        .output()
        .expect("command run");

    assert!(output.status.success());
    let schema: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(schema["properties"]["status"].is_object());
}
