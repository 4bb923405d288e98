// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted mirror of the last-seen bucket listing (`s3_structure.json`).

use anvil_core::Manifest;
use std::io;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> ManifestStore {
        ManifestStore { path: path.into() }
    }

    /// Load the mirror; `None` on first run (no file yet).
    pub fn load(&self) -> io::Result<Option<Manifest>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Persist atomically. Serialization is deterministic, so an
    /// unchanged listing re-persists byte-identically.
    pub fn store(&self, manifest: &Manifest) -> io::Result<()> {
        let bytes = serde_json::to_vec_pretty(manifest)?;
        crate::write_atomic(&self.path, &bytes)
    }
}

#[cfg(test)]
#[path = "manifest_store_tests.rs"]
mod tests;
