//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary against a throwaway data directory and
//! verify outputs.

use std::process::Command;

use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &TempDir, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_cyclekeeper"))
        .env("CYCLEKEEPER_DATA_DIR", data_dir.path())
        .env_remove("CYCLEKEEPER_LOG")
        .args(args)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn test_start_then_status() {
    let dir = TempDir::new().unwrap();
    let (stdout, stderr, code) = run_cli(&dir, &["cycle", "start", "Write report", "-m", "25"]);
    assert_eq!(code, 0, "start failed: {stderr}");
    assert!(stdout.contains("cycle_started"));

    let (stdout, _, code) = run_cli(&dir, &["cycle", "status"]);
    assert_eq!(code, 0);
    assert!(stdout.contains(" - Write report"), "unexpected status: {stdout}");
}

#[test]
fn test_status_without_cycle() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(&dir, &["cycle", "status"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("no active cycle"));
}

#[test]
fn test_second_start_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (_, _, code) = run_cli(&dir, &["cycle", "start", "First", "--minutes", "25"]);
    assert_eq!(code, 0);

    let (_, stderr, code) = run_cli(&dir, &["cycle", "start", "Second", "--minutes", "25"]);
    assert_eq!(code, 1);
    assert!(stderr.starts_with("error:"), "unexpected stderr: {stderr}");
}

#[test]
fn test_invalid_duration_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (_, _, code) = run_cli(&dir, &["cycle", "start", "Too long", "--minutes", "61"]);
    assert_eq!(code, 1);
    let (_, _, code) = run_cli(&dir, &["cycle", "start", "   ", "--minutes", "25"]);
    assert_eq!(code, 1);

    let (stdout, _, _) = run_cli(&dir, &["history", "--json"]);
    let rows: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(rows.as_array().map(Vec::len), Some(0));
}

#[test]
fn test_interrupt_shows_in_history() {
    let dir = TempDir::new().unwrap();
    run_cli(&dir, &["cycle", "start", "Write report", "--minutes", "25"]);

    let (stdout, _, code) = run_cli(&dir, &["cycle", "interrupt"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("cycle_interrupted"));

    let (stdout, _, code) = run_cli(&dir, &["history", "--json"]);
    assert_eq!(code, 0);
    let rows: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["status"], "interrupted");
    assert_eq!(rows[0]["task"], "Write report");
    assert!(rows[0]["interrupted_at"].is_string());
}

#[test]
fn test_interrupt_without_cycle_is_noop() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(&dir, &["cycle", "interrupt"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("no active cycle"));
}

#[test]
fn test_reset_clears_history() {
    let dir = TempDir::new().unwrap();
    run_cli(&dir, &["cycle", "start", "X", "--minutes", "5"]);
    let (_, _, code) = run_cli(&dir, &["cycle", "reset"]);
    assert_eq!(code, 0);

    let (stdout, _, _) = run_cli(&dir, &["history"]);
    assert!(stdout.contains("no cycles yet"));
}

#[test]
fn test_config_get_and_set() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(&dir, &["config", "get", "cycle.max_duration_minutes"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "60");

    let (_, _, code) = run_cli(&dir, &["config", "set", "cycle.max_duration_minutes", "90"]);
    assert_eq!(code, 0);
    let (_, _, code) = run_cli(&dir, &["cycle", "start", "Long", "--minutes", "90"]);
    assert_eq!(code, 0);

    let (_, _, code) = run_cli(&dir, &["config", "set", "cycle.min_duration_minutes", "0"]);
    assert_eq!(code, 1);
}

#[test]
fn test_config_unknown_key() {
    let dir = TempDir::new().unwrap();
    let (_, _, code) = run_cli(&dir, &["config", "get", "cycle.nope"]);
    assert_eq!(code, 1);
}
