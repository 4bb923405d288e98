// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn internal_errors_get_the_generic_public_text() {
    let err = StageError::internal("gradle blew up");
    assert_eq!(err.message, "gradle blew up");
    assert_eq!(err.msg_public, GENERIC_PUBLIC);
}

#[test]
fn into_terminal_preserves_both_audiences() {
    let err = StageError::new("staff", "user");
    match err.into_terminal() {
        TerminalMessage::Failure {
            message,
            msg_public,
        } => {
            assert_eq!(message, "staff");
            assert_eq!(msg_public, "user");
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[test]
fn subprocess_timeout_mentions_the_step_publicly() {
    let err: StageError = SubprocessError::TimedOut {
        context: "debuild".to_string(),
        timeout: std::time::Duration::from_secs(1),
    }
    .into();
    assert!(err.msg_public.contains("debuild"));
    assert!(err.msg_public.contains("took too long"));
}

#[test]
fn spawn_errors_stay_internal() {
    let err: StageError = SubprocessError::Spawn {
        context: "npm".to_string(),
        source: std::io::Error::other("missing"),
    }
    .into();
    assert_eq!(err.msg_public, GENERIC_PUBLIC);
}
