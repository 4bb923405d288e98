// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg(unix)]

use super::*;
use std::time::Duration;
use tempfile::tempdir;

#[tokio::test]
async fn run_with_timeout_captures_output() {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg("echo out; echo err >&2");

    let output = run_with_timeout(cmd, Duration::from_secs(5), "echo test")
        .await
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "out");
    assert_eq!(String::from_utf8_lossy(&output.stderr).trim(), "err");
}

#[tokio::test]
async fn run_with_timeout_kills_hung_command() {
    let mut cmd = Command::new("sleep");
    cmd.arg("30");

    let err = run_with_timeout(cmd, Duration::from_millis(100), "sleep test")
        .await
        .unwrap_err();
    assert!(matches!(err, SubprocessError::TimedOut { .. }));
}

#[tokio::test]
async fn run_with_timeout_reports_spawn_failure() {
    let cmd = Command::new("/nonexistent/definitely-not-a-binary");
    let err = run_with_timeout(cmd, Duration::from_secs(1), "bogus")
        .await
        .unwrap_err();
    assert!(matches!(err, SubprocessError::Spawn { .. }));
}

#[tokio::test]
async fn run_logged_appends_both_streams() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("tool.log");

    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg("echo first; echo second >&2");
    let status = run_logged(cmd, Duration::from_secs(5), "tool run", &log)
        .await
        .unwrap();
    assert!(status.success());

    let text = std::fs::read_to_string(&log).unwrap();
    assert!(text.contains("$ tool run"));
    assert!(text.contains("first"));
    assert!(text.contains("second"));
}

#[tokio::test]
async fn run_logged_interleaves_invocations_in_order() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("tool.log");

    for word in ["one", "two"] {
        let mut cmd = Command::new("echo");
        cmd.arg(word);
        run_logged(cmd, Duration::from_secs(5), word, &log)
            .await
            .unwrap();
    }

    let text = std::fs::read_to_string(&log).unwrap();
    let one = text.find("one").unwrap();
    let two = text.find("\ntwo").unwrap();
    assert!(one < two);
}

#[tokio::test]
async fn run_logged_times_out_and_marks_log() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("tool.log");

    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg("echo started; sleep 30");
    let err = run_logged(cmd, Duration::from_millis(200), "hung tool", &log)
        .await
        .unwrap_err();
    assert!(matches!(err, SubprocessError::TimedOut { .. }));

    let text = std::fs::read_to_string(&log).unwrap();
    assert!(text.contains("[hung tool timed out]"));
}

#[tokio::test]
async fn run_logged_reports_nonzero_exit() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("tool.log");

    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg("exit 3");
    let status = run_logged(cmd, Duration::from_secs(5), "failing tool", &log)
        .await
        .unwrap();
    assert_eq!(status.code(), Some(3));
}
