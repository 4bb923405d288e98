// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use anvil_core::{Environment, Platform};
use std::path::PathBuf;
use std::time::Duration;

use crate::service::ServiceError;

/// Worker version reported to the backend and the Admin API.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Baked default; deployments override via ANVIL_API_TOKEN.
const DEFAULT_API_TOKEN: &str = "anvil-worker";

/// Resolve state directory: ANVIL_STATE_DIR > XDG_STATE_HOME/anvil > ~/.local/state/anvil
pub fn state_dir() -> Result<PathBuf, ServiceError> {
    if let Ok(dir) = std::env::var("ANVIL_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("anvil"));
    }
    let home = std::env::var("HOME").map_err(|_| ServiceError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/anvil"))
}

/// Backend base URL, environment default unless overridden.
pub fn backend_url(env: Environment) -> String {
    std::env::var("ANVIL_BACKEND_URL").unwrap_or_else(|_| env.default_backend_url().to_string())
}

/// Fixed bearer credential for all backend requests.
pub fn api_token() -> String {
    std::env::var("ANVIL_API_TOKEN").unwrap_or_else(|_| DEFAULT_API_TOKEN.to_string())
}

/// Object-store bucket for the dependency cache.
pub fn bucket(env: Environment) -> String {
    std::env::var("ANVIL_BUCKET").unwrap_or_else(|_| env.default_bucket())
}

/// Platforms this host builds; defaults to the host-OS set.
pub fn platforms() -> Vec<Platform> {
    if let Ok(raw) = std::env::var("ANVIL_PLATFORMS") {
        let parsed: Vec<Platform> = raw
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        if !parsed.is_empty() {
            return parsed;
        }
    }
    anvil_core::host_platforms(anvil_core::HostOs::current())
}

/// Admin API port (fixed 55555 unless overridden).
pub fn admin_port() -> u16 {
    std::env::var("ANVIL_ADMIN_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(crate::admin::ADMIN_PORT)
}

/// TLS identity for the Admin API, when configured.
pub fn admin_tls() -> Option<(PathBuf, PathBuf)> {
    let cert = std::env::var("ANVIL_TLS_CERT").ok()?;
    let key = std::env::var("ANVIL_TLS_KEY").ok()?;
    Some((PathBuf::from(cert), PathBuf::from(key)))
}

/// Hard wall-clock budget for one build child.
pub fn build_timeout() -> Duration {
    duration_ms("ANVIL_BUILD_TIMEOUT_MS").unwrap_or(crate::builder::BUILD_TIMEOUT)
}

/// Builder/Notifier poll interval (fixed 5 s unless overridden).
pub fn poll_interval() -> Duration {
    duration_ms("ANVIL_POLL_INTERVAL_MS").unwrap_or(Duration::from_secs(5))
}

/// Updater sync interval (fixed 60 s unless overridden).
pub fn sync_interval() -> Duration {
    duration_ms("ANVIL_SYNC_INTERVAL_MS").unwrap_or(Duration::from_secs(60))
}

/// Heartbeat interval (fixed 60 s unless overridden).
pub fn heartbeat_interval() -> Duration {
    duration_ms("ANVIL_HEARTBEAT_INTERVAL_MS").unwrap_or(Duration::from_secs(60))
}

fn duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}
