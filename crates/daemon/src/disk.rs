// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Disk-pressure guard, run before each Builder iteration.
//!
//! When either the root or home filesystem drops under 1 GiB or 25%
//! free, the host temp scratch (package-manager leftovers) is purged
//! best-effort before the next job lands.

use anvil_adapters::subprocess::run_with_timeout;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const MIN_FREE_BYTES: u64 = 1024 * 1024 * 1024;
pub const MIN_FREE_FRACTION: f64 = 0.25;

const CACHE_CLEAN_TIMEOUT: Duration = Duration::from_secs(120);

/// Prefixes of temp-dir entries owned by the build tooling.
const SCRATCH_PREFIXES: [&str; 2] = ["npm-", "git"];

/// Check free space and purge scratch when low. Never fails the caller.
pub async fn ensure_headroom() {
    let mut candidates: Vec<PathBuf> = vec![PathBuf::from(root_fs())];
    if let Some(home) = home_dir() {
        candidates.push(home);
    }

    if candidates.iter().any(|p| headroom_low(p)) {
        tracing::warn!("disk headroom low, purging scratch");
        purge_scratch().await;
    }
}

/// Whether a filesystem is under the free-space floor.
pub fn headroom_low(path: &Path) -> bool {
    let (Ok(available), Ok(total)) = (fs2::available_space(path), fs2::total_space(path)) else {
        return false;
    };
    if total == 0 {
        return false;
    }
    available < MIN_FREE_BYTES || (available as f64 / total as f64) < MIN_FREE_FRACTION
}

/// Remove temp entries left by the build tooling and clean the package
/// manager cache. Entries owned by other users fail with EPERM and are
/// skipped.
pub async fn purge_scratch() {
    let tmp = std::env::temp_dir();
    let Ok(entries) = std::fs::read_dir(&tmp) else {
        return;
    };
    for entry in entries.filter_map(|e| e.ok()) {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !SCRATCH_PREFIXES.iter().any(|p| name.starts_with(p)) {
            continue;
        }
        let path = entry.path();
        let result = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        if let Err(err) = result {
            tracing::debug!(path = %path.display(), error = %err, "scratch entry skipped");
        }
    }

    let mut cmd = tokio::process::Command::new(npm_bin());
    cmd.arg("cache").arg("clean").arg("--force");
    if let Err(err) = run_with_timeout(cmd, CACHE_CLEAN_TIMEOUT, "npm cache clean").await {
        tracing::debug!(error = %err, "package manager cache clean failed");
    }
}

fn root_fs() -> &'static str {
    if cfg!(windows) {
        "C:\\"
    } else {
        "/"
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .ok()
        .map(PathBuf::from)
}

fn npm_bin() -> &'static str {
    if cfg!(windows) {
        "npm.cmd"
    } else {
        "npm"
    }
}

#[cfg(test)]
#[path = "disk_tests.rs"]
mod tests;
