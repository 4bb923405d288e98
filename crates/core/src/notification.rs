// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal record of a job's outcome.
//!
//! Enqueued exactly once per job by the Builder, drained by the Notifier.
//! Absence of both messages means the build succeeded.

use crate::platform::Platform;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub code: String,
    pub platform: Platform,
    pub starttime: u64,
    /// Staff-facing error detail, logged server-side only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg_internal: Option<String>,
    /// End-user-facing error text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg_public: Option<String>,
}

impl Notification {
    pub fn success(code: impl Into<String>, platform: Platform, starttime: u64) -> Notification {
        Notification {
            code: code.into(),
            platform,
            starttime,
            msg_internal: None,
            msg_public: None,
        }
    }

    pub fn failure(
        code: impl Into<String>,
        platform: Platform,
        starttime: u64,
        msg_internal: impl Into<String>,
        msg_public: impl Into<String>,
    ) -> Notification {
        Notification {
            code: code.into(),
            platform,
            starttime,
            msg_internal: Some(msg_internal.into()),
            msg_public: Some(msg_public.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.msg_internal.is_none() && self.msg_public.is_none()
    }
}

#[cfg(test)]
#[path = "notification_tests.rs"]
mod tests;
