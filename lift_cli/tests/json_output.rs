//! `--json` output: one JSON document on stdout, errors as JSON on stderr.
use assert_cmd::prelude::*;
use serde_json::Value;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

fn parse_line(bytes: &[u8]) -> Value {
    let s = String::from_utf8_lossy(bytes);
    let line = s.lines().last().expect("no output");
    serde_json::from_str(line).unwrap_or_else(|e| panic!("not JSON ({e}): {line}"))
}

#[test]
fn health_reports_defaults_for_an_empty_store() {
    let out = Command::cargo_bin("lift_cli")
        .unwrap()
        .args(["--json", "health"])
        .output()
        .unwrap();
    assert!(out.status.success());

    let v = parse_line(&out.stdout);
    assert_eq!(v["status"], "uncalibrated");
    assert_eq!(v["device_name"], "LiftHost");
    assert_eq!(v["theme"], "primary");
    assert_eq!(v["store"], "memory");
    assert!(v["bottom_mm"].is_null());
    assert_eq!(v["bus_capacity"], 10);
}

#[test]
fn health_lists_persisted_keys() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("store.toml");
    fs::write(&store, "limit_bottom = 4.2\nlimit_top = 17.3\ntheme = 2\n").unwrap();

    let out = Command::cargo_bin("lift_cli")
        .unwrap()
        .arg("--json")
        .arg("--store")
        .arg(&store)
        .arg("health")
        .output()
        .unwrap();
    assert!(out.status.success());

    let v = parse_line(&out.stdout);
    assert_eq!(v["status"], "ok");
    assert_eq!(v["theme"], "alternate");
    let bottom = v["bottom_mm"].as_f64().unwrap();
    assert!((bottom - 4.2).abs() < 1e-4, "{bottom}");
    let keys: Vec<&str> = v["stored_keys"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(keys.contains(&"limit_top"), "{keys:?}");
}

#[test]
fn config_errors_are_structured() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("bad.toml");
    fs::write(&cfg, "[sampling]\nretain = 1.5\n").unwrap();

    let out = Command::cargo_bin("lift_cli")
        .unwrap()
        .arg("--json")
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));

    let v = parse_line(&out.stderr);
    assert_eq!(v["reason"], "Config");
    assert_eq!(v["exit_code"], 2);
    assert!(v["message"].as_str().unwrap().contains("sampling.retain"));
}

#[test]
fn self_check_reports_the_probed_height() {
    let out = Command::cargo_bin("lift_cli")
        .unwrap()
        .args(["--json", "self-check"])
        .output()
        .unwrap();
    assert!(out.status.success());

    let v = parse_line(&out.stdout);
    assert_eq!(v["status"], "ok");
    let h = v["sensor_path_mm"].as_f64().unwrap();
    assert!((h - 10.0).abs() < 1.0, "{h}");
}
