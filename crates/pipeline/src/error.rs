// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two-audience stage error.
//!
//! `message` is logged server-side for staff; `msg_public` is the only
//! text shown to the end user. Every stage failure carries both.

use anvil_adapters::SubprocessError;
use anvil_core::TerminalMessage;

/// Public text for failures with no user-actionable cause.
pub const GENERIC_PUBLIC: &str =
    "The compilation failed unexpectedly. Please try again or contact support.";

#[derive(Debug, Clone, PartialEq)]
pub struct StageError {
    pub message: String,
    pub msg_public: String,
}

impl StageError {
    pub fn new(message: impl Into<String>, msg_public: impl Into<String>) -> StageError {
        StageError {
            message: message.into(),
            msg_public: msg_public.into(),
        }
    }

    /// An internal failure the user can do nothing about.
    pub fn internal(message: impl Into<String>) -> StageError {
        StageError::new(message, GENERIC_PUBLIC)
    }

    pub fn io(context: &str, err: std::io::Error) -> StageError {
        StageError::internal(format!("{}: {}", context, err))
    }

    pub fn into_terminal(self) -> TerminalMessage {
        TerminalMessage::Failure {
            message: self.message,
            msg_public: self.msg_public,
        }
    }
}

impl std::fmt::Display for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for StageError {}

impl From<SubprocessError> for StageError {
    fn from(err: SubprocessError) -> StageError {
        match &err {
            SubprocessError::TimedOut { context, .. } => StageError::new(
                err.to_string(),
                format!("The {} step took too long and was aborted.", context),
            ),
            _ => StageError::internal(err.to_string()),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
