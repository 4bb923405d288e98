// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Object-store manifest model and cache-target derivation.
//!
//! The Updater mirrors the remote bucket listing to `s3_structure.json`;
//! that file is the single source of truth for what is currently in the
//! dependency cache. Field names here are bit-compatible with the
//! persisted JSON.

use crate::platform::HostOs;
use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One object-store listing entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "LastModified")]
    pub last_modified: String,
    #[serde(rename = "ETag")]
    pub etag: String,
    #[serde(rename = "Size")]
    pub size: u64,
}

/// The full mirrored listing.
pub type Manifest = Vec<ManifestEntry>;

/// Tracked top-level folders in the bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheFolder {
    Platforms,
    Plugins,
    Compilers,
    Libs,
    Sdks,
}

crate::simple_display! {
    CacheFolder {
        Platforms => "platforms",
        Plugins => "plugins",
        Compilers => "compilers",
        Libs => "libs",
        Sdks => "sdks",
    }
}

/// Where a manifest key unpacks inside the local `data/` tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheTarget {
    pub folder: CacheFolder,
    pub name: String,
}

const ARCHIVE_SUFFIX: &str = ".tar.bz2";
const COMPILER_PREFIX: &str = "compiler_cordova_";

impl CacheTarget {
    /// Derive the cache target for a bucket key, or `None` for keys
    /// outside the tracked folders (those are silently ignored).
    ///
    /// - `platforms/{name}.tar.bz2` -> `data/platforms/{name}`
    /// - `compilers/compiler_cordova_{v}.tar.bz2` -> `data/compilers/{v}`
    /// - `plugins/{name}.tar.bz2` -> `data/plugins/{name}`
    /// - `libs/{v}-{os}.tar.bz2` -> `data/libs/{v}`
    /// - `sdks/{name}.tar.bz2` -> `data/sdks/{name}`
    pub fn derive(key: &str) -> Option<CacheTarget> {
        let (folder_name, file) = key.split_once('/')?;
        // Nested keys never map to a cache subtree.
        if file.is_empty() || file.contains('/') {
            return None;
        }
        let stem = file.strip_suffix(ARCHIVE_SUFFIX)?;
        if stem.is_empty() {
            return None;
        }

        let (folder, name) = match folder_name {
            "platforms" => (CacheFolder::Platforms, stem.to_string()),
            "plugins" => (CacheFolder::Plugins, stem.to_string()),
            "sdks" => (CacheFolder::Sdks, stem.to_string()),
            "compilers" => {
                let version = stem.strip_prefix(COMPILER_PREFIX)?;
                if version.is_empty() {
                    return None;
                }
                (CacheFolder::Compilers, version.to_string())
            }
            "libs" => {
                // {cordova-version}-{os}: the trailing os tag names the
                // host build of the archive, not the cache entry.
                let (version, _os) = stem.rsplit_once('-')?;
                if version.is_empty() {
                    return None;
                }
                (CacheFolder::Libs, version.to_string())
            }
            _ => return None,
        };

        Some(CacheTarget { folder, name })
    }

    /// Absolute output directory under the local cache root.
    pub fn output_dir(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(self.folder.to_string()).join(&self.name)
    }
}

/// Whether a key matters on this host.
///
/// `libs/` and `sdks/` archives are built per host OS and carry the OS
/// as a key suffix; every other tracked folder is host-independent.
pub fn is_relevant(key: &str, host: HostOs) -> bool {
    if key.starts_with("libs/") || key.starts_with("sdks/") {
        let needle = format!("-{}{}", host.key_suffix(), ARCHIVE_SUFFIX);
        key.ends_with(&needle)
    } else {
        true
    }
}

/// Normalize a last-modified timestamp to RFC 3339 UTC seconds.
///
/// The remote listing and the persisted mirror may format the same
/// instant differently; both sides are normalized before the string
/// comparison that drives re-download decisions. Unparseable values
/// fall back to the trimmed original (still deterministic).
pub fn normalize_last_modified(raw: &str) -> String {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.to_utc().to_rfc3339_opts(SecondsFormat::Secs, true);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return dt.to_utc().to_rfc3339_opts(SecondsFormat::Secs, true);
    }
    raw.to_string()
}

/// Outcome of comparing one remote entry against the persisted mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Download,
    Ignore,
}

/// Decide whether a remote entry needs downloading.
///
/// Download when there is no prior manifest entry, when the local output
/// directory is missing (a crashed extraction leaves it half-built and
/// it must be redone), or when the remote `LastModified` differs.
pub fn sync_status(
    entry: &ManifestEntry,
    prior: Option<&ManifestEntry>,
    output_exists: bool,
) -> SyncStatus {
    let Some(prior) = prior else {
        return SyncStatus::Download;
    };
    if !output_exists {
        return SyncStatus::Download;
    }
    if normalize_last_modified(&prior.last_modified) != normalize_last_modified(&entry.last_modified)
    {
        return SyncStatus::Download;
    }
    SyncStatus::Ignore
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
