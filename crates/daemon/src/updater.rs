// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Updater: reconciles the local dependency cache with the remote
//! object store and gates the Builder through `data/ready.lock`.
//!
//! Each iteration rebuilds `sync/`, lists the bucket, downloads and
//! extracts what changed, purges what disappeared, persists the listing
//! mirror, and finally touches the readiness marker. An error aborts the
//! iteration; partial output directories are redetected and redone on
//! the next pass.

use crate::service::{Service, ServiceError};
use anvil_adapters::subprocess::{run_with_timeout, EXTRACT_TIMEOUT};
use anvil_core::{
    is_relevant, sync_status, CacheTarget, FarmPaths, HostOs, Manifest, ManifestEntry, SyncStatus,
};
use anvil_storage::{ManifestStore, ReadyMarker};
use async_trait::async_trait;
use futures_util::TryStreamExt;
use object_store::ObjectStore;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

pub const UPDATER_SERVICE_ID: &str = "updater";

/// Unpacks one downloaded archive into its cache directory.
#[async_trait]
pub trait ArchiveExtractor: Send + Sync {
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<(), String>;
}

/// Production extractor: `tar -jxf` on POSIX, `bsdtar -xf` on Windows.
pub struct TarExtractor;

#[async_trait]
impl ArchiveExtractor for TarExtractor {
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<(), String> {
        let mut cmd = if cfg!(windows) {
            let mut cmd = tokio::process::Command::new("bsdtar");
            cmd.arg("-xf");
            cmd
        } else {
            let mut cmd = tokio::process::Command::new("tar");
            cmd.arg("-jxf");
            cmd
        };
        cmd.arg(archive).arg("-C").arg(dest);

        let output = run_with_timeout(cmd, EXTRACT_TIMEOUT, "archive extract")
            .await
            .map_err(|e| e.to_string())?;
        if !output.status.success() {
            return Err(format!(
                "extract of {} failed: {}",
                archive.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(())
    }
}

/// What one sync iteration did.
#[derive(Debug, Default, PartialEq)]
pub struct SyncReport {
    pub downloaded: Vec<String>,
    pub purged: Vec<String>,
    /// Relevant entries in the new listing.
    pub tracked: usize,
}

pub struct UpdaterService {
    farm: FarmPaths,
    store: Arc<dyn ObjectStore>,
    manifest_store: ManifestStore,
    ready: ReadyMarker,
    host_os: HostOs,
    extractor: Arc<dyn ArchiveExtractor>,
    interval: Duration,
}

impl UpdaterService {
    pub fn new(farm: FarmPaths, store: Arc<dyn ObjectStore>) -> UpdaterService {
        let manifest_store = ManifestStore::new(farm.manifest_path());
        let ready = ReadyMarker::new(&farm);
        UpdaterService {
            farm,
            store,
            manifest_store,
            ready,
            host_os: HostOs::current(),
            extractor: Arc::new(TarExtractor),
            interval: crate::env::sync_interval(),
        }
    }

    pub fn with_host_os(mut self, host_os: HostOs) -> UpdaterService {
        self.host_os = host_os;
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn ArchiveExtractor>) -> UpdaterService {
        self.extractor = extractor;
        self
    }

    /// One full reconciliation pass.
    pub async fn sync(&self) -> Result<SyncReport, ServiceError> {
        let data_dir = self.farm.data_dir();
        std::fs::create_dir_all(&data_dir)?;

        // The scratch dir is recreated empty every iteration.
        let sync_dir = self.farm.sync_dir();
        remove_dir_if_present(&sync_dir)?;
        std::fs::create_dir_all(&sync_dir)?;

        let mut listing: Vec<ManifestEntry> = self
            .store
            .list(None)
            .map_ok(|meta| ManifestEntry {
                key: meta.location.to_string(),
                last_modified: meta.last_modified.to_rfc3339(),
                etag: meta.e_tag.unwrap_or_default(),
                size: meta.size as u64,
            })
            .try_collect()
            .await
            .map_err(|e| ServiceError::Sync(format!("bucket listing failed: {}", e)))?;
        listing.sort_by(|a, b| a.key.cmp(&b.key));

        let relevant: Vec<(ManifestEntry, CacheTarget)> = listing
            .into_iter()
            .filter(|entry| is_relevant(&entry.key, self.host_os))
            .filter_map(|entry| CacheTarget::derive(&entry.key).map(|target| (entry, target)))
            .collect();

        let prior = self.manifest_store.load()?;
        let mut report = SyncReport {
            tracked: relevant.len(),
            ..SyncReport::default()
        };

        for (entry, target) in &relevant {
            let out_dir = target.output_dir(&data_dir);
            let prior_entry = prior
                .as_ref()
                .and_then(|m| m.iter().find(|p| p.key == entry.key));

            if sync_status(entry, prior_entry, out_dir.is_dir()) == SyncStatus::Download {
                self.fetch_and_extract(entry, &out_dir, &sync_dir).await?;
                report.downloaded.push(entry.key.clone());
            }
        }

        // Purge cache subtrees whose entry left the bucket.
        if let Some(prior) = &prior {
            for old in prior {
                if relevant.iter().any(|(entry, _)| entry.key == old.key) {
                    continue;
                }
                if let Some(target) = CacheTarget::derive(&old.key) {
                    remove_dir_if_present(&target.output_dir(&data_dir))?;
                    report.purged.push(old.key.clone());
                }
            }
        }

        let manifest: Manifest = relevant.into_iter().map(|(entry, _)| entry).collect();
        self.manifest_store.store(&manifest)?;
        remove_dir_if_present(&sync_dir)?;

        if !manifest.is_empty() {
            self.ready.touch()?;
        }

        Ok(report)
    }

    async fn fetch_and_extract(
        &self,
        entry: &ManifestEntry,
        out_dir: &Path,
        sync_dir: &Path,
    ) -> Result<(), ServiceError> {
        let basename = entry.key.rsplit('/').next().unwrap_or(&entry.key);
        let archive = sync_dir.join(basename);
        tracing::info!(key = %entry.key, "downloading");

        let location = object_store::path::Path::from(entry.key.as_str());
        let get = self
            .store
            .get(&location)
            .await
            .map_err(|e| ServiceError::Sync(format!("get {} failed: {}", entry.key, e)))?;

        let mut file = tokio::fs::File::create(&archive).await?;
        let mut stream = get.into_stream();
        while let Some(chunk) = stream
            .try_next()
            .await
            .map_err(|e| ServiceError::Sync(format!("read {} failed: {}", entry.key, e)))?
        {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        // Empty the output directory, then unpack into it. A crash here
        // leaves a missing or partial dir; the next iteration re-detects
        // and redoes the work.
        remove_dir_if_present(out_dir)?;
        std::fs::create_dir_all(out_dir)?;
        self.extractor
            .extract(&archive, out_dir)
            .await
            .map_err(ServiceError::Sync)
    }
}

#[async_trait]
impl Service for UpdaterService {
    fn id(&self) -> &'static str {
        UPDATER_SERVICE_ID
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn tick(&mut self) -> Result<(), ServiceError> {
        let report = self.sync().await?;
        tracing::info!(
            tracked = report.tracked,
            downloaded = report.downloaded.len(),
            purged = report.purged.len(),
            "cache sync complete"
        );
        Ok(())
    }
}

fn remove_dir_if_present(dir: &Path) -> std::io::Result<()> {
    match std::fs::remove_dir_all(dir) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
#[path = "updater_tests.rs"]
mod tests;
