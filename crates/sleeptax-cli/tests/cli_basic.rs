//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary with an isolated data directory and verify
//! JSON output and structured errors.

use std::path::Path;
use std::process::Command;

use serde_json::Value;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_sleeptax"))
        .args(args)
        .env("SLEEPTAX_DATA_DIR", data_dir)
        .env_remove("SLEEPTAX_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_json(data_dir: &Path, args: &[&str]) -> Value {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

/// Run a command expected to fail and return its error code.
fn run_error(data_dir: &Path, args: &[&str]) -> String {
    let (_, stderr, code) = run_cli(data_dir, args);
    assert_ne!(code, 0, "{args:?} unexpectedly succeeded");
    let last = stderr.lines().last().unwrap_or_default();
    let body: Value = serde_json::from_str(last).expect("Failed to parse error JSON");
    body["error"]["code"].as_str().unwrap().to_string()
}

#[test]
fn test_pledge_log_leaderboard_flow() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();

    let user = run_json(d, &["auth", "login", "--user-id", "alice", "--name", "Alice"]);
    assert_eq!(user["id"], "alice");
    assert!(user["avatarUrl"].as_str().unwrap().contains("ui-avatars.com"));

    let created = run_json(d, &["group", "create", "Night Owls"]);
    assert_eq!(created["group"]["ownerId"], "alice");
    assert_eq!(created["week"]["weekNumber"], 1);

    assert_eq!(run_error(d, &["log", "2024-01-05", "8"]), "PLEDGE_REQUIRED");
    assert_eq!(run_error(d, &["pledge", "60"]), "INVALID_AMOUNT");
    assert_eq!(run_cli(d, &["pledge", "show"]).0.trim(), "null");

    let pledge = run_json(d, &["pledge", "10"]);
    assert_eq!(pledge["amount"], 10.0);
    assert_eq!(run_error(d, &["pledge", "5"]), "ALREADY_PLEDGED");
    assert_eq!(run_json(d, &["pledge", "show"])["amount"], 10.0);

    run_json(d, &["log", "2024-01-05", "8"]);
    assert_eq!(run_error(d, &["log", "2024-01-05", "25"]), "INVALID_HOURS");
    assert_eq!(run_error(d, &["log", "2024-01-06", "-1"]), "INVALID_HOURS");
    assert_eq!(run_error(d, &["log", "01/05/2024", "8"]), "INVALID_DATE");

    let board = run_json(d, &["leaderboard"]);
    assert_eq!(board.as_array().unwrap().len(), 1);
    assert_eq!(board[0]["totalHours"], 8.0);
    assert_eq!(board[0]["taxPledged"], 10.0);
    assert_eq!(board[0]["rank"], 1);

    let entries = run_json(d, &["entry", "list"]);
    assert_eq!(entries.as_array().unwrap().len(), 1);
    let entry_id = entries[0]["id"].as_str().unwrap().to_string();
    assert_eq!(run_json(d, &["entry", "amend", &entry_id, "7"])["hours"], 7.0);

    let next = run_json(d, &["week", "end"]);
    assert_eq!(next["weekNumber"], 2);
    let history = run_json(d, &["week", "history"]);
    assert_eq!(history[0]["winnerId"], "alice");
    assert_eq!(history[1]["isActive"], true);
}

#[test]
fn test_non_owner_cannot_end_week() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();

    run_json(d, &["auth", "login", "--user-id", "alice", "--name", "Alice"]);
    let created = run_json(d, &["group", "create", "G"]);
    let code = created["group"]["code"].as_str().unwrap().to_string();
    assert!(code.starts_with("SLEEP-"));

    run_json(d, &["auth", "login", "--user-id", "bob", "--name", "Bob"]);
    run_json(d, &["group", "join", &code]);
    assert_eq!(run_error(d, &["week", "end"]), "FORBIDDEN");

    let shown = run_json(d, &["group", "show"]);
    assert_eq!(shown["members"].as_array().unwrap().len(), 2);
    assert_eq!(shown["currentWeek"]["weekNumber"], 1);
}

#[test]
fn test_signed_out_and_no_group() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();

    assert_eq!(run_error(d, &["auth", "whoami"]), "NOT_AUTHENTICATED");
    assert_eq!(run_error(d, &["group", "create", "G"]), "NOT_AUTHENTICATED");

    run_json(d, &["auth", "login", "--user-id", "alice", "--name", "Alice"]);
    assert_eq!(run_error(d, &["leaderboard"]), "NOT_FOUND");
    assert_eq!(run_error(d, &["group", "join", "SLEEP-NOPE"]), "NOT_FOUND");
}

#[test]
fn test_demo_leaderboard() {
    let dir = tempfile::tempdir().unwrap();
    let board = run_json(dir.path(), &["demo", "--today", "2024-03-10"]);
    let rows = board.as_array().unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0]["userId"], "user-1");
    assert_eq!(rows[0]["streak"], 5);
    assert_eq!(rows[0]["totalHours"], 15.5);
    assert_eq!(rows[3]["entriesCount"], 0);
}

#[test]
fn test_config_commands() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();

    let (stdout, _, code) = run_cli(d, &["config", "get", "rules.max_pledge"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim().parse::<f64>().unwrap(), 50.0);

    let (stdout, _, code) = run_cli(d, &["config", "set", "rules.max_pledge", "20"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok");
    assert_eq!(run_json(d, &["config", "list"])["rules"]["max_pledge"], 20.0);

    assert_eq!(run_error(d, &["config", "set", "rules.max_pledge", "lots"]), "CONFIG");
    assert_eq!(run_error(d, &["config", "get", "no.such.key"]), "CONFIG");

    let (_, _, code) = run_cli(d, &["config", "reset"]);
    assert_eq!(code, 0);
    assert_eq!(run_json(d, &["config", "list"])["rules"]["max_pledge"], 50.0);
}
