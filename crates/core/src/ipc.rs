// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builder <-> build child terminal message.
//!
//! The child reports exactly one terminal state per job: a single line of
//! JSON, `null` on success or `{"message", "msgPublic"}` on a structured
//! failure. The message is written to a well-known file with an atomic
//! rename so the supervising Builder never observes a partial write.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FailureBody {
    message: String,
    #[serde(rename = "msgPublic")]
    msg_public: String,
}

/// The one message a build child sends before exiting.
#[derive(Debug, Clone, PartialEq)]
pub enum TerminalMessage {
    Success,
    Failure { message: String, msg_public: String },
}

impl TerminalMessage {
    pub fn failure(message: impl Into<String>, msg_public: impl Into<String>) -> TerminalMessage {
        TerminalMessage::Failure {
            message: message.into(),
            msg_public: msg_public.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TerminalMessage::Success)
    }

    /// Encode as a single JSON line.
    pub fn encode(&self) -> String {
        match self {
            TerminalMessage::Success => "null".to_string(),
            TerminalMessage::Failure {
                message,
                msg_public,
            } => serde_json::to_string(&FailureBody {
                message: message.clone(),
                msg_public: msg_public.clone(),
            })
            .unwrap_or_else(|_| "null".to_string()),
        }
    }

    pub fn decode(line: &str) -> Result<TerminalMessage, serde_json::Error> {
        let body: Option<FailureBody> = serde_json::from_str(line.trim())?;
        Ok(match body {
            None => TerminalMessage::Success,
            Some(b) => TerminalMessage::Failure {
                message: b.message,
                msg_public: b.msg_public,
            },
        })
    }

    /// Write the message next to `path` and rename it into place.
    pub fn write_atomic(&self, path: &Path) -> io::Result<()> {
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, self.encode())?;
        std::fs::rename(&tmp, path)
    }

    /// Read a message file if it exists and parses.
    pub fn read(path: &Path) -> Option<TerminalMessage> {
        let text = std::fs::read_to_string(path).ok()?;
        TerminalMessage::decode(&text).ok()
    }
}

#[cfg(test)]
#[path = "ipc_tests.rs"]
mod tests;
