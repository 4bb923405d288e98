// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deployment environment tag.
//!
//! The environment selects the backend host, the object-store bucket the
//! Updater mirrors, and the workspace retention policy.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One of the three deployments a worker host can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Develop,
    Testing,
    Production,
}

crate::simple_display! {
    Environment {
        Develop => "develop",
        Testing => "testing",
        Production => "production",
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "develop" => Ok(Environment::Develop),
            "testing" => Ok(Environment::Testing),
            "production" => Ok(Environment::Production),
            other => Err(format!("unknown environment: {}", other)),
        }
    }
}

impl Environment {
    /// Default backend base URL for this environment.
    ///
    /// Deployments override this through `ANVIL_BACKEND_URL`
    /// (resolved in the daemon's env module).
    pub fn default_backend_url(&self) -> &'static str {
        match self {
            Environment::Develop => "https://build-api.develop.anvil.app",
            Environment::Testing => "https://build-api.testing.anvil.app",
            Environment::Production => "https://build-api.anvil.app",
        }
    }

    /// Object-store bucket holding this environment's dependency archives.
    pub fn default_bucket(&self) -> String {
        format!("anvil-deps-{}", self)
    }

    /// Whether job workspaces survive a successful upload.
    ///
    /// Develop preserves workspaces for inspection; testing and
    /// production purge them.
    pub fn retains_workspaces(&self) -> bool {
        matches!(self, Environment::Develop)
    }

    /// Whether services register themselves with the backend.
    /// Develop hosts stay unregistered.
    pub fn registers_with_backend(&self) -> bool {
        !matches!(self, Environment::Develop)
    }
}

#[cfg(test)]
#[path = "environment_tests.rs"]
mod tests;
