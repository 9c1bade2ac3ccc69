//! CLI E2E tests.
//!
//! Each test runs the built binary against its own data directory.

use std::path::Path;
use std::process::Command;

use serde_json::Value;

fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_realitycheck-cli"))
        .args(args)
        .env("REALITYCHECK_DATA_DIR", data_dir)
        .env_remove("REALITYCHECK_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_json(data_dir: &Path, args: &[&str]) -> Value {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "CLI command failed: {args:?}\n{stderr}");
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

#[test]
fn offline_session_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path();

    let started = run_json(data, &["--user", "u1", "session", "start"]);
    assert_eq!(started[0]["type"], "session_started");
    assert_eq!(started[0]["kind"], "offline");

    let status = run_json(data, &["--user", "u1", "session", "status"]);
    assert_eq!(status["session"]["state"], "active");

    let paused = run_json(data, &["--user", "u1", "session", "pause"]);
    assert_eq!(paused[0]["type"], "session_paused");

    let ended = run_json(data, &["--user", "u1", "session", "end"]);
    assert_eq!(ended[0]["type"], "session_ended");
    assert_eq!(ended[0]["duration_minutes"], 0);
    assert_eq!(ended[1]["type"], "stats_updated");
    assert_eq!(ended[1]["offline_session_count"], 1);

    let history = run_json(data, &["--user", "u1", "session", "history"]);
    assert_eq!(history.as_array().unwrap().len(), 1);

    let stats = run_json(data, &["--user", "u1", "stats", "show"]);
    assert_eq!(stats["current_streak"], 1);
}

#[test]
fn second_start_fails_with_message() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path();

    run_json(data, &["--user", "u1", "session", "start", "--kind", "touch-grass"]);
    let (_, stderr, code) = run_cli(data, &["--user", "u1", "session", "start", "--kind", "touch-grass"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("already active"), "{stderr}");

    // Offline sessions are tracked separately.
    run_json(data, &["--user", "u1", "session", "start"]);
}

#[test]
fn end_without_session_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["--user", "u1", "session", "end"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("No active offline session"), "{stderr}");
}

#[test]
fn signed_out_commands_do_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let started = run_json(dir.path(), &["session", "start"]);
    assert_eq!(started, Value::Array(Vec::new()));

    let (stdout, stderr, code) = run_cli(dir.path(), &["stats", "show"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "null");
    assert!(stderr.contains("not signed in"));
}

#[test]
fn short_usage_window_is_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path();

    let started = run_json(data, &["--user", "u1", "usage", "start", "Home"]);
    assert_eq!(started[0]["type"], "usage_started");
    let stopped = run_json(data, &["--user", "u1", "usage", "stop"]);
    assert_eq!(stopped[0]["type"], "usage_discarded");
    let logs = run_json(data, &["--user", "u1", "usage", "list"]);
    assert_eq!(logs, Value::Array(Vec::new()));
}

#[test]
fn app_state_background_suspends_usage() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path();

    run_json(data, &["--user", "u1", "usage", "start", "Garden"]);
    let out = run_json(data, &["--user", "u1", "app-state", "background"]);
    assert_eq!(out["transition"], "to_background");
    assert_eq!(out["state"], "background");

    let out = run_json(data, &["--user", "u1", "app-state", "inactive"]);
    assert_eq!(out["transition"], Value::Null);

    let out = run_json(data, &["--user", "u1", "app-state", "active"]);
    assert_eq!(out["transition"], "to_foreground");
    let events = out["events"].as_array().unwrap();
    assert!(events
        .iter()
        .any(|e| e["type"] == "usage_started" && e["screen_name"] == "Garden"));
}

#[test]
fn config_set_persists() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path();

    let (stdout, _, code) = run_cli(data, &["config", "set", "tracking.min_usage_minutes", "3"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok");

    let (stdout, _, _) = run_cli(data, &["config", "get", "tracking.min_usage_minutes"]);
    assert_eq!(stdout.trim(), "3");

    let (_, _, code) = run_cli(data, &["config", "set", "tracking.bogus", "1"]);
    assert_eq!(code, 1);
}

#[test]
fn forced_offline_serves_mock_stats() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path();

    run_cli(data, &["config", "set", "backend.force_offline", "true"]);
    let stats = run_json(data, &["stats", "show", "--user", "demo-user"]);
    assert_eq!(stats["offline_session_count"], 3);
    assert_eq!(stats["total_offline_minutes"], 135);
}
