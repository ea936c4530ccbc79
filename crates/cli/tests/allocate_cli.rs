use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const CENTERS: &str = "\
program_name,people_served,incentive,past_funding,region
Oak Grove,100,0,1000,north
Pine Hill,200,0,1000,south
Elm Park,50,0,100,east
";

#[allow(deprecated)]
fn cli(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("funding-allocator").expect("binary");
    cmd.current_dir(workdir)
        .env_remove("FUNDING_ALLOCATOR_CONFIG")
        .env_remove("FUNDING_RATE_MAX")
        .env_remove("FUNDING_OUTPUT_DIR")
        .env_remove("RUST_LOG");
    cmd
}

fn run(cmd: &mut Command) -> (bool, Value) {
    let output = cmd.output().expect("command run");
    let body: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    (output.status.success(), body)
}

fn setup() -> tempfile::TempDir {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("centers.csv"), CENTERS).unwrap();
    temp
}

#[test]
fn allocate_writes_csv_and_json_response() {
    let temp = setup();
    let root = temp.path();

    let (ok, body) = run(cli(root).args([
        "allocate",
        "--input",
        "centers.csv",
        "--total-funding",
        "2100",
        "--cap",
        "800",
        "--output",
        "out/result.csv",
    ]));

    assert!(ok, "unexpected failure: {body}");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["data"]["status"]["kind"], "converged");
    let rate = body["data"]["per_person_rate"].as_f64().unwrap();
    assert!((rate - 10.0).abs() < 1e-6, "rate = {rate}");
    assert_eq!(body["meta"]["rows"], 3);

    let written = fs::read_to_string(root.join("out/result.csv")).unwrap();
    let mut lines = written.lines();
    assert_eq!(
        lines.next().unwrap(),
        "program_name,people_served,incentive,past_funding,region,effective_cap,per_person_rate,per_center_funding,total_funding,base_funding,unincorporated_funding,global_cap"
    );
    assert!(lines.next().unwrap().starts_with("Oak Grove,100,0,1000,north,800,"));
}

#[test]
fn allocate_defaults_to_timestamped_file_in_output_dir() {
    let temp = setup();
    let root = temp.path();

    let (ok, body) = run(cli(root).args([
        "allocate",
        "-i",
        "centers.csv",
        "--total-funding",
        "3500",
        "--output-dir",
        "results",
    ]));

    assert!(ok);
    let output_path = body["meta"]["output_path"].as_str().unwrap();
    assert!(output_path.contains("optimized_"), "{output_path}");
    let entries: Vec<_> = fs::read_dir(root.join("results")).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn saturation_is_a_warning_unless_strict() {
    let temp = setup();
    let root = temp.path();

    let (ok, body) = run(cli(root).args([
        "allocate",
        "-i",
        "centers.csv",
        "--total-funding",
        "5000",
        "--cap",
        "800",
        "-o",
        "loose.csv",
    ]));
    assert!(ok);
    assert_eq!(body["data"]["status"]["kind"], "saturated");
    assert_eq!(body["data"]["status"]["reason"], "caps_exhausted");
    let warned = body["hints"].as_array().unwrap().iter().any(|hint| {
        hint["type"] == "warn"
            && hint["text"]
                .as_str()
                .unwrap()
                .starts_with("Optimization failed")
    });
    assert!(warned, "missing saturation warning: {body}");
    assert!(root.join("loose.csv").is_file());

    let (ok, body) = run(cli(root).args([
        "allocate",
        "-i",
        "centers.csv",
        "--total-funding",
        "5000",
        "--cap",
        "800",
        "-o",
        "strict.csv",
        "--strict",
    ]));
    assert!(!ok);
    assert_eq!(body["error"]["code"], "infeasible");
    assert!(!root.join("strict.csv").exists());
}

#[test]
fn missing_columns_fail_with_invalid_input() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    fs::write(root.join("bad.csv"), "program_name,people_served\nA,10\n").unwrap();

    let (ok, body) = run(cli(root).args(["allocate", "-i", "bad.csv", "--total-funding", "100"]));

    assert!(!ok);
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"]["code"], "invalid_input");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("'people_served' and 'incentive'"));
}

#[test]
fn negative_parameters_fail_with_invalid_parameter() {
    let temp = setup();
    let (ok, body) = run(cli(temp.path()).args([
        "allocate",
        "-i",
        "centers.csv",
        "--total-funding",
        "100",
        "--base-funding",
        "-5",
    ]));

    assert!(!ok);
    assert_eq!(body["error"]["code"], "invalid_parameter");
}

#[test]
fn historical_deviation_is_reported() {
    let temp = setup();
    let root = temp.path();

    // historical total is 2100
    let (ok, body) = run(cli(root).args([
        "allocate",
        "-i",
        "centers.csv",
        "--total-funding",
        "3500",
        "-o",
        "out.csv",
    ]));

    assert!(ok);
    let warnings = body["data"]["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0]["code"], "historical_deviation");
    assert_eq!(body["data"]["historical_total"], 2100.0);
}

#[test]
fn report_flag_writes_markdown() {
    let temp = setup();
    let root = temp.path();

    let (ok, body) = run(cli(root).args([
        "allocate",
        "-i",
        "centers.csv",
        "--total-funding",
        "2100",
        "-o",
        "out.csv",
        "--report",
        "reports/summary.md",
    ]));

    assert!(ok);
    assert!(body["meta"]["report_path"].is_string());
    let markdown = fs::read_to_string(root.join("reports/summary.md")).unwrap();
    assert!(markdown.contains("## Per-center comparison"));
    assert!(markdown.contains("Oak Grove"));
}

#[test]
fn settings_file_changes_rate_ceiling() {
    let temp = setup();
    let root = temp.path();
    fs::write(root.join("funding.toml"), "[solver]\nrate_max = 2.0\n").unwrap();

    let (ok, body) = run(cli(root).args([
        "allocate",
        "-i",
        "centers.csv",
        "--total-funding",
        "3500",
        "-o",
        "out.csv",
    ]));

    assert!(ok);
    assert_eq!(body["data"]["rate_max"], 2.0);
    assert_eq!(body["data"]["status"]["reason"], "rate_ceiling");
    assert!(body["meta"]["config_path"]
        .as_str()
        .unwrap()
        .ends_with("funding.toml"));
}

#[test]
fn broken_settings_file_is_invalid_config() {
    let temp = setup();
    let root = temp.path();
    fs::write(root.join("settings.toml"), "[solver]\nrate_maximum = 10.0\n").unwrap();

    let (ok, body) = run(cli(root).args([
        "--config",
        "settings.toml",
        "validate",
        "-i",
        "centers.csv",
    ]));

    assert!(!ok);
    assert_eq!(body["error"]["code"], "invalid_config");
}

#[test]
fn validate_reports_table_shape() {
    let temp = setup();
    let (ok, body) = run(cli(temp.path()).args(["validate", "--input", "centers.csv"]));

    assert!(ok);
    assert_eq!(body["data"]["rows"], 3);
    assert_eq!(body["data"]["has_past_funding"], true);
    assert_eq!(body["data"]["has_per_center_cap"], false);
    assert_eq!(body["data"]["people_served_total"], 350.0);
}

#[test]
fn quiet_mode_keeps_stderr_free_of_info_logs() {
    let temp = setup();
    cli(temp.path())
        .args(["--quiet", "validate", "-i", "centers.csv"])
        .assert()
        .success()
        .stderr(predicate::str::contains("INFO").not());
}
