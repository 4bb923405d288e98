// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output redaction.
//!
//! Build-child output is logged and shipped to the backend; absolute
//! paths in it would leak the worker's filesystem layout (workspace
//! location, home directory) into user-visible logs, so they are
//! stripped before anything leaves the process.

use std::path::Path;

/// Remove every occurrence of the given absolute paths from `text`.
///
/// Longer paths are stripped first so a workspace nested under the home
/// directory does not leave a dangling home prefix behind.
pub fn redact_paths(text: &str, paths: &[&Path]) -> String {
    let mut needles: Vec<String> = paths
        .iter()
        .map(|p| p.display().to_string())
        .filter(|s| !s.is_empty() && s != "/")
        .collect();
    needles.sort_by_key(|s| std::cmp::Reverse(s.len()));

    let mut out = text.to_string();
    for needle in &needles {
        out = out.replace(needle.as_str(), "");
    }
    out
}

#[cfg(test)]
#[path = "redact_tests.rs"]
mod tests;
