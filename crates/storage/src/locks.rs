// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-process coordination files.
//!
//! Peers never talk to each other directly; they observe these files.
//! The working lock advertises "inside a job" to the Admin API and to a
//! cooperative stop. The ready marker gates the Builder on the Updater's
//! first completed sync. The meta file carries what the status API needs.

use anvil_core::FarmPaths;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;

/// Zero-byte `{service_id}.lock`: exists while the service is working.
#[derive(Debug, Clone)]
pub struct WorkingLock {
    path: PathBuf,
}

impl WorkingLock {
    pub fn new(farm: &FarmPaths, service_id: &str) -> WorkingLock {
        WorkingLock {
            path: farm.service_lock(service_id),
        }
    }

    pub fn acquire(&self) -> io::Result<()> {
        std::fs::write(&self.path, b"")
    }

    pub fn release(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    pub fn is_held(&self) -> bool {
        self.path.exists()
    }

    /// Probe another service's lock.
    pub fn is_working(farm: &FarmPaths, service_id: &str) -> bool {
        farm.service_lock(service_id).exists()
    }
}

/// `data/ready.lock`: the Updater has populated the cache at least once.
#[derive(Debug, Clone)]
pub struct ReadyMarker {
    path: PathBuf,
}

impl ReadyMarker {
    pub fn new(farm: &FarmPaths) -> ReadyMarker {
        ReadyMarker {
            path: farm.ready_lock(),
        }
    }

    pub fn touch(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, b"")
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

/// `{service_id}.meta.json`: identity the Admin API reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceMeta {
    pub pid: u32,
    pub started_epoch_ms: u64,
    pub version: String,
}

impl ServiceMeta {
    pub fn write(&self, farm: &FarmPaths, service_id: &str) -> io::Result<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        crate::write_atomic(&farm.service_meta(service_id), &bytes)
    }

    pub fn load(farm: &FarmPaths, service_id: &str) -> Option<ServiceMeta> {
        let bytes = std::fs::read(farm.service_meta(service_id)).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    pub fn remove(farm: &FarmPaths, service_id: &str) -> io::Result<()> {
        match std::fs::remove_file(farm.service_meta(service_id)) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
#[path = "locks_tests.rs"]
mod tests;
