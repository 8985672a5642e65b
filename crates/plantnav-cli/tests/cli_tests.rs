//! CLI integration tests
//!
//! These run the `plantnav` binary end to end against the built-in rules
//! and temporary rule/config files.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

fn plantnav(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_plantnav"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to execute CLI")
}

fn stdout_of(output: &Output) -> String {
    assert!(
        output.status.success(),
        "CLI command should succeed. Stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn topics(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(|line| {
            let value: Value = serde_json::from_str(line).unwrap();
            value["topic"].as_str().unwrap().to_string()
        })
        .collect()
}

#[test]
fn test_rules_check_builtin() {
    let stdout = stdout_of(&plantnav(&["rules", "check"]));
    assert!(stdout.contains("Rules valid"));
    assert!(stdout.contains("modes: 5"));
}

#[test]
fn test_rules_check_rejects_bad_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("rules.yaml");
    fs::write(&path, "schema_version: 99\nlayers: []\nmodes: []\n").unwrap();

    let output = plantnav(&["rules", "check", "--rules", path.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
}

#[test]
fn test_rules_list_marks_defaults() {
    let stdout = stdout_of(&plantnav(&["rules", "list"]));
    assert!(stdout.contains("monitoring -> MONITORING (requires connection)"));
    assert!(stdout.contains("* 3d-view"));
}

#[test]
fn test_layers_for_ranking_view() {
    let stdout = stdout_of(&plantnav(&["layers", "monitoring", "ranking-view"]));
    let layers: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(layers["threejs-container"], Value::Bool(false));
    assert_eq!(layers["view-container"], Value::Bool(true));
}

#[test]
fn test_layers_unknown_mode_fails() {
    let output = plantnav(&["layers", "lobby"]);
    assert!(!output.status.success());
}

#[test]
fn test_panels_report() {
    let stdout = stdout_of(&plantnav(&["panels", "analysis"]));
    let report: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["equipment-edit-modal"]["allowed"], Value::Bool(false));
    assert_eq!(report["equipment-edit-modal"]["closes_if_open"], Value::Bool(true));
    assert_eq!(report["debug-panel"]["allowed"], Value::Bool(true));
    assert_eq!(report["debug-panel"]["closes_if_open"], Value::Bool(false));
}

#[test]
fn test_simulate_prints_events() {
    let stdout = stdout_of(&plantnav(&["simulate", "monitoring/ranking-view", "back"]));
    let topics = topics(&stdout);

    assert_eq!(topics.iter().filter(|t| *t == "navigation:complete").count(), 3);
    assert!(topics.contains(&"mode:monitoring:enter".to_string()));
    assert!(topics.contains(&"service:activate".to_string()));
}

#[test]
fn test_simulate_offline_blocks() {
    let output = plantnav(&["simulate", "--offline", "--strict", "analysis"]);
    assert!(!output.status.success());
    let topics = topics(&String::from_utf8_lossy(&output.stdout));
    assert!(topics.contains(&"navigation:blocked".to_string()));
}

#[test]
fn test_simulate_closes_open_panel() {
    let stdout = stdout_of(&plantnav(&[
        "simulate",
        "--open",
        "equipment-info-panel",
        "settings",
    ]));
    let lines: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let closed = lines
        .iter()
        .find(|line| line["topic"] == "panel:closed")
        .expect("panel:closed printed");
    assert_eq!(closed["event"]["panel"], "equipment-info-panel");
    assert_eq!(closed["event"]["reason"], "mode_change");
}

#[test]
fn test_simulate_with_config() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("navigator.toml");
    fs::write(&path, "home_mode = \"layout\"\n").unwrap();

    let output = plantnav(&["simulate", "--config", path.to_str().unwrap(), "home"]);
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    stdout_of(&output);
    assert!(stderr.contains("final state: layout/3d-view"));
}

#[test]
fn test_simulate_rejects_unknown_panel() {
    let output = plantnav(&["simulate", "--open", "toolbox", "home"]);
    assert!(!output.status.success());
}
