// The sim backend is only compiled without the `hardware` feature.
#![cfg(not(feature = "hardware"))]

use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

const VALID: &str = r#"
[pins]
encoder_a = 18
encoder_b = 19
step_switch = 22
mode_button = 21
status_led = 25

[display]
# No splash hold so short runs spend their time in the loop
splash_ms = 0

[sim]
flush_ms = 1
press_every_ms = 150
master_poll_ms = 20
"#;

fn write_config(dir: &tempfile::TempDir, toml: &str) -> PathBuf {
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn handwheel(cfg: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("handwheel").unwrap();
    cmd.arg("--config").arg(cfg).env_remove("RUST_LOG");
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["self-check"], 0, "OK", "stdout")]
#[case(&["run", "--duration-ms", "300"], 0, "stopped after", "stdout")]
#[case(&["run", "--duration-ms", "300", "--stats"], 0, "bus polls=", "stderr")]
#[case(&["run", "--rt-lock", "sometimes"], 2, "invalid value", "stderr")]
#[case(&["--log-level", "loud", "self-check"], 2, "invalid value", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, VALID);

    let mut cmd = handwheel(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
#[case("status_led = 25", "status_led = 21", "share GPIO 21")]
#[case("splash_ms = 0", "splash_ms = 0\nstatus_line = 64", "status_line")]
#[case("master_poll_ms = 20", "master_poll_ms = 20\nencoder_rate_hz = 0", "encoder_rate_hz")]
fn invalid_config_is_explained(#[case] from: &str, #[case] to: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, &VALID.replace(from, to));

    handwheel(&cfg)
        .arg("self-check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("What happened: Configuration is invalid"))
        .stderr(predicate::str::contains(needle));
}

#[test]
fn missing_config_file_points_at_flag() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("absent.toml");

    handwheel(&cfg)
        .arg("self-check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--config"));
}

#[test]
fn json_self_check_prints_status() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, VALID);

    let out = handwheel(&cfg)
        .args(["--json", "self-check"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["status"], "ok");
}

#[test]
fn json_run_reports_stats() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, VALID);

    let out = handwheel(&cfg)
        .args(["--json", "run", "--duration-ms", "300", "--stats"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["status"], "stopped");
    assert!(v["iterations"].as_u64().unwrap() > 0);
    assert!(v["stats"]["redraws"].as_u64().unwrap() >= 1);
    assert!(v["stats"]["heartbeat_toggles"].as_u64().unwrap() >= 1);
    assert!(v["stats"]["master_replies"].as_u64().unwrap() >= 1);
}

#[test]
fn json_errors_are_structured() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, &VALID.replace("status_led = 25", "status_led = 18"));

    let out = handwheel(&cfg)
        .args(["--json", "self-check"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
    let v: serde_json::Value = serde_json::from_slice(&out.stderr).unwrap();
    assert_eq!(v["reason"], "Config");
    assert!(v["message"].as_str().unwrap().contains("share GPIO 18"));
}
