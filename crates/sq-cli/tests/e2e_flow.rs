//! End-to-end tests driving the `sq` binary.
//!
//! Each invocation is a fresh process over the same database file, so these
//! also cover resuming an in-progress session after a restart.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn sq_binary() -> String {
    env!("CARGO_BIN_EXE_sq").to_string()
}

/// Run `sq` with an isolated home directory and database.
fn sq(temp: &Path, args: &[&str]) -> Output {
    Command::new(sq_binary())
        .env("HOME", temp)
        .env("SQ_DATABASE_PATH", temp.join("data/sq.db"))
        .env_remove("XDG_CONFIG_HOME")
        .env_remove("XDG_DATA_HOME")
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("failed to run sq")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn assert_success(output: &Output, what: &str) {
    assert!(
        output.status.success(),
        "{what} should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_full_session_lifecycle() {
    let temp = TempDir::new().unwrap();

    let started = sq(temp.path(), &["start"]);
    assert_success(&started, "sq start");
    assert!(stdout(&started).starts_with("Started session #1 at "));
    assert!(
        temp.path().join("data/sq.db").exists(),
        "database should be created on first use"
    );

    let status = sq(temp.path(), &["status"]);
    assert_success(&status, "sq status");
    let status = stdout(&status);
    assert!(status.contains("Tracking: session #1 since"), "{status}");
    assert!(status.contains("Available: stop"), "{status}");

    // The running session survives the restart and blocks another start
    let again = sq(temp.path(), &["start"]);
    assert!(!again.status.success(), "second start should fail");
    assert!(String::from_utf8_lossy(&again.stderr).contains("already in progress"));

    let stopped = sq(temp.path(), &["stop", "--quality", "4"]);
    assert_success(&stopped, "sq stop");
    let stopped = stdout(&stopped);
    assert!(stopped.starts_with("Stopped session #1 after "), "{stopped}");
    assert!(stopped.contains("Rated session #1: pretty_good"), "{stopped}");

    let history = sq(temp.path(), &["history", "--json"]);
    assert_success(&history, "sq history --json");
    let records: serde_json::Value = serde_json::from_slice(&history.stdout).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], 1);
    assert_eq!(records[0]["quality"], "pretty_good");
    assert_ne!(records[0]["start_time"], records[0]["end_time"]);

    let text = sq(temp.path(), &["history"]);
    assert_success(&text, "sq history");
    let text = stdout(&text);
    assert!(text.starts_with("Here is your sleep data"), "{text}");
    assert!(text.contains("Pretty good"), "{text}");

    let cleared = sq(temp.path(), &["clear"]);
    assert_success(&cleared, "sq clear");
    assert!(stdout(&cleared).contains("(1 sessions deleted)"));

    let rated = sq(temp.path(), &["rate", "1", "5"]);
    assert_success(&rated, "rating a cleared session");
    assert_eq!(stdout(&rated), "Session #1 not found; nothing to rate.\n");

    let noop = sq(temp.path(), &["stop"]);
    assert_success(&noop, "stop with nothing running");
    assert_eq!(stdout(&noop), "No session in progress.\n");
}

#[test]
fn test_stop_without_quality_leaves_session_unrated() {
    let temp = TempDir::new().unwrap();

    assert_success(&sq(temp.path(), &["start"]), "sq start");
    let stopped = sq(temp.path(), &["stop"]);
    assert_success(&stopped, "sq stop");
    assert!(stdout(&stopped).contains("Rate it with: sq rate 1 <0-5>"));

    let history = sq(temp.path(), &["history", "--json"]);
    let records: serde_json::Value = serde_json::from_slice(&history.stdout).unwrap();
    assert!(records[0]["quality"].is_null());

    let rated = sq(temp.path(), &["rate", "#1", "very_bad"]);
    assert_success(&rated, "sq rate");
    assert_eq!(stdout(&rated), "Rated session #1: very_bad\n");

    // After a stop the next night can start
    let next = sq(temp.path(), &["start"]);
    assert_success(&next, "second night");
    assert!(stdout(&next).starts_with("Started session #2 at "));
}

#[test]
fn test_rejects_invalid_quality() {
    let temp = TempDir::new().unwrap();

    let output = sq(temp.path(), &["rate", "1", "7"]);
    assert!(!output.status.success());
    assert!(!temp.path().join("data/sq.db").exists());
}

#[test]
fn test_watch_prints_current_list() {
    let temp = TempDir::new().unwrap();
    assert_success(&sq(temp.path(), &["start"]), "sq start");

    let output = sq(temp.path(), &["watch", "--count", "1"]);
    assert_success(&output, "sq watch");
    let output = stdout(&output);
    assert!(output.starts_with("+ [0] #1  "), "{output}");
    assert!(output.trim_end().ends_with("in progress"), "{output}");
}
