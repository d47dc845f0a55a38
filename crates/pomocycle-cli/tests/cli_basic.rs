//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary with HOME pointed at a temporary directory
//! so the real user config is never touched.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str], stdin: Option<&str>) -> (String, String, i32) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_pomocycle-cli"))
        .args(args)
        .env("HOME", home)
        .env_remove("POMOCYCLE_ENV")
        .env_remove("POMOCYCLE_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute CLI command");

    {
        let mut pipe = child.stdin.take().expect("stdin is piped");
        if let Some(input) = stdin {
            pipe.write_all(input.as_bytes()).unwrap();
        }
    }

    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn write_timer_config(dir: &Path, name: &str, json: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, json).unwrap();
    path.to_string_lossy().into_owned()
}

const SHORT: &str = r#"{
    "phaseDurations": {"work": 3, "break": 1, "longBreak": 1},
    "phaseOrder": ["work", "break"],
    "startPhaseIndex": 0
}"#;

#[test]
fn test_config_get_defaults() {
    let home = tempfile::tempdir().unwrap();
    let (out, _, code) = run_cli(home.path(), &["config", "get", "timer.phaseDurations.work"], None);
    assert_eq!(code, 0);
    assert_eq!(out.trim(), "1500");
    assert!(home.path().join(".config/pomocycle/config.toml").exists());
}

#[test]
fn test_config_set_then_get() {
    let home = tempfile::tempdir().unwrap();
    let (_, _, code) = run_cli(home.path(), &["config", "set", "clock.tick_ms", "250"], None);
    assert_eq!(code, 0);
    let (out, _, _) = run_cli(home.path(), &["config", "get", "clock.tick_ms"], None);
    assert_eq!(out.trim(), "250");
}

#[test]
fn test_config_set_rejects_invalid_start_index() {
    let home = tempfile::tempdir().unwrap();
    let (_, err, code) = run_cli(home.path(), &["config", "set", "timer.startPhaseIndex", "42"], None);
    assert_ne!(code, 0);
    assert!(err.contains("error:"), "stderr: {err}");
}

#[test]
fn test_config_list_json() {
    let home = tempfile::tempdir().unwrap();
    let (out, _, code) = run_cli(home.path(), &["config", "list"], None);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["timer"]["phaseOrder"].as_array().unwrap().len(), 6);
}

#[test]
fn test_timer_validate() {
    let home = tempfile::tempdir().unwrap();
    let good = write_timer_config(home.path(), "good.json", SHORT);
    let (out, _, code) = run_cli(home.path(), &["timer", "validate", &good], None);
    assert_eq!(code, 0);
    assert_eq!(out.trim(), "ok: 2 phases");

    let bad = write_timer_config(
        home.path(),
        "bad.json",
        r#"{"phaseDurations": {"work": 3}, "phaseOrder": ["work", "nap"]}"#,
    );
    let (_, err, code) = run_cli(home.path(), &["timer", "validate", &bad], None);
    assert_ne!(code, 0);
    assert!(err.contains("nap"), "stderr: {err}");
}

#[test]
fn test_timer_show_marks_start_phase() {
    let home = tempfile::tempdir().unwrap();
    let (out, _, code) = run_cli(home.path(), &["timer", "show"], None);
    assert_eq!(code, 0);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], "0 work 25:00 *");
    assert_eq!(lines[5], "5 longBreak 15:00");
}

#[test]
fn test_timer_run_counts_down_and_rolls_over() {
    let home = tempfile::tempdir().unwrap();
    let cfg = write_timer_config(home.path(), "short.json", SHORT);
    let (out, _, code) = run_cli(
        home.path(),
        &["timer", "run", "--config", &cfg, "--tick-ms", "5", "--json"],
        Some("start\n"),
    );
    assert_eq!(code, 0);
    let states: Vec<serde_json::Value> = out
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(states.len(), 5, "stdout: {out}");
    assert_eq!(states[0]["secondsLeft"], 3);
    assert_eq!(states[0]["running"], false);
    assert_eq!(states[1]["running"], true);
    assert_eq!(states[3]["secondsLeft"], 1);
    assert_eq!(states[4]["phaseIndex"], 1);
    assert_eq!(states[4]["running"], false);
}

#[test]
fn test_timer_run_human_output_and_skip() {
    let home = tempfile::tempdir().unwrap();
    let (out, err, code) = run_cli(home.path(), &["timer", "run"], Some("skip\nbogus\nquit\n"));
    assert_eq!(code, 0);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines, vec!["work [1/6] 25:00 paused", "break [2/6] 05:00 paused"]);
    assert!(err.contains("bogus"), "stderr: {err}");
}

#[test]
fn test_timer_run_relabels_only_states_of_new_config() {
    let home = tempfile::tempdir().unwrap();
    let cfg = write_timer_config(home.path(), "short.json", SHORT);
    let focus = write_timer_config(
        home.path(),
        "focus.json",
        r#"{"phaseDurations": {"focus": 7}, "phaseOrder": ["focus"]}"#,
    );
    let input = format!("skip\nconfig {focus}\nquit\n");
    let (out, err, code) = run_cli(
        home.path(),
        &["timer", "run", "--config", &cfg, "--tick-ms", "5"],
        Some(&input),
    );
    assert_eq!(code, 0, "stderr: {err}");
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(
        lines,
        vec![
            "work [1/2] 00:03 paused",
            "break [2/2] 00:01 paused",
            "focus [1/1] 00:07 paused",
        ]
    );
}

#[test]
fn test_timer_run_with_all_flags_leaves_config_file_alone() {
    let home = tempfile::tempdir().unwrap();
    let cfg = write_timer_config(home.path(), "short.json", SHORT);
    let (out, err, code) = run_cli(
        home.path(),
        &["timer", "run", "--config", &cfg, "--tick-ms", "5", "--json"],
        Some("quit\n"),
    );
    assert_eq!(code, 0, "stderr: {err}");
    assert_eq!(out.lines().count(), 1);
    assert!(!home.path().join(".config/pomocycle/config.toml").exists());

    // A broken config file does not matter either.
    let dir = home.path().join(".config/pomocycle");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), "not [valid toml").unwrap();
    let (_, err, code) = run_cli(
        home.path(),
        &["timer", "run", "--config", &cfg, "--tick-ms", "5", "--json"],
        Some("quit\n"),
    );
    assert_eq!(code, 0, "stderr: {err}");
}
