// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk layout shared by all services.
//!
//! `FarmPaths` is one environment's state tree (`workspace/{env}/`);
//! `JobWorkspace` is one job's directory inside it. The layout is the
//! contract between the Updater, Builder, build child, Notifier, and the
//! Admin API, so every path lives here.

use crate::environment::Environment;
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};

/// Root of one environment's on-disk state.
#[derive(Debug, Clone)]
pub struct FarmPaths {
    root: PathBuf,
}

impl FarmPaths {
    pub fn new(state_root: &Path, env: Environment) -> FarmPaths {
        FarmPaths {
            root: state_root.join("workspace").join(env.to_string()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local dependency cache populated by the Updater.
    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    /// Scratch directory owned exclusively by the Updater,
    /// recreated every sync iteration.
    pub fn sync_dir(&self) -> PathBuf {
        self.root.join("sync")
    }

    /// Per-job workspace parent.
    pub fn projects_dir(&self) -> PathBuf {
        self.root.join("projects")
    }

    /// Persisted mirror of the last-seen bucket listing.
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join("s3_structure.json")
    }

    /// Readiness marker gating the Builder. Exists once the Updater has
    /// populated the cache at least once.
    pub fn ready_lock(&self) -> PathBuf {
        self.data_dir().join("ready.lock")
    }

    /// Durable notification queue directory.
    pub fn queue_dir(&self) -> PathBuf {
        self.root.join("queue")
    }

    /// A service's working lock: exists while the service is inside a job.
    pub fn service_lock(&self, service_id: &str) -> PathBuf {
        self.root.join(format!("{}.lock", service_id))
    }

    /// A service's metadata file (pid, start time, version).
    pub fn service_meta(&self, service_id: &str) -> PathBuf {
        self.root.join(format!("{}.meta.json", service_id))
    }

    /// A service's stdout log, served by the Admin API.
    pub fn service_log(&self, service_id: &str) -> PathBuf {
        self.root.join(format!("{}.log", service_id))
    }

    /// Create the base tree (root, data, projects).
    pub fn ensure_base(&self) -> io::Result<()> {
        std::fs::create_dir_all(self.data_dir())?;
        std::fs::create_dir_all(self.projects_dir())
    }
}

/// One job's directory tree: `projects/{code}_{starttime}/`.
///
/// Created by the Builder, mutated only by the job's own build child,
/// read by the Notifier for upload, destroyed by the Notifier afterwards.
#[derive(Debug, Clone)]
pub struct JobWorkspace {
    dir: PathBuf,
}

impl JobWorkspace {
    pub fn new(farm: &FarmPaths, code: &str, starttime: u64) -> JobWorkspace {
        JobWorkspace {
            dir: farm.projects_dir().join(format!("{}_{}", code, starttime)),
        }
    }

    /// Wrap an existing workspace directory (the build child receives the
    /// path from its parent).
    pub fn from_dir(dir: PathBuf) -> JobWorkspace {
        JobWorkspace { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    /// The native project copy the build tools run against.
    pub fn project_dir(&self) -> PathBuf {
        self.dir.join("workspace")
    }

    /// Zip extraction staging.
    pub fn tmp_dir(&self) -> PathBuf {
        self.dir.join("tmp")
    }

    pub fn certs_dir(&self) -> PathBuf {
        self.dir.join("certs")
    }

    pub fn icons_dir(&self) -> PathBuf {
        self.dir.join("icons")
    }

    pub fn splashes_dir(&self) -> PathBuf {
        self.dir.join("splashes")
    }

    /// Final artifacts.
    pub fn out_dir(&self) -> PathBuf {
        self.dir.join("out")
    }

    pub fn config_json(&self) -> PathBuf {
        self.dir.join("config.json")
    }

    pub fn config_xml(&self) -> PathBuf {
        self.dir.join("config.xml")
    }

    pub fn source_zip(&self) -> PathBuf {
        self.dir.join("source.zip")
    }

    /// Native tool output log; its tail becomes part of the user-visible
    /// failure message.
    pub fn cordova_log(&self) -> PathBuf {
        self.dir.join("cordova.log")
    }

    /// The build child's captured stdout/stderr.
    pub fn stdout_log(&self) -> PathBuf {
        self.dir.join("stdout.log")
    }

    /// The child's single terminal IPC message.
    pub fn ipc_path(&self) -> PathBuf {
        self.dir.join("ipc.json")
    }

    /// Create the full directory tree.
    pub fn create(&self) -> io::Result<()> {
        for dir in [
            self.dir.clone(),
            self.project_dir(),
            self.tmp_dir(),
            self.certs_dir(),
            self.icons_dir(),
            self.splashes_dir(),
            self.out_dir(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Persist the raw job JSON as `config.json`.
    ///
    /// Written to a sibling temp file and renamed so a workspace never
    /// holds a half-written config.
    pub fn write_config_json(&self, raw: &Value) -> io::Result<()> {
        let tmp = self.dir.join("config.json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(raw)?)?;
        std::fs::rename(&tmp, self.config_json())
    }

    /// First file in `out/`: the artifact the Notifier uploads.
    pub fn first_artifact(&self) -> Option<PathBuf> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(self.out_dir())
            .ok()?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        files.sort();
        files.into_iter().next()
    }

    /// Remove the whole workspace tree.
    pub fn remove(&self) -> io::Result<()> {
        if self.dir.exists() {
            std::fs::remove_dir_all(&self.dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
