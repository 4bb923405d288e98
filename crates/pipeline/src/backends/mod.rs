// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Platform backends.
//!
//! Each target platform implements the same three-operation contract:
//! emit a signing descriptor, run the native build sequence, and collect
//! the produced artifacts into the output zip. Everything
//! platform-specific stays behind this trait.

pub mod android;
pub mod apple;
pub mod ubuntu;
pub mod windows;

use crate::archive::zip_files;
use crate::error::StageError;
use crate::BuildContext;
use anvil_backend::fetch_to_file;
use anvil_core::Platform;
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use walkdir::WalkDir;

#[async_trait]
pub trait PlatformBackend: Send + Sync {
    /// Emit the signing descriptor file the native tool consumes.
    async fn build_json(&self, ctx: &BuildContext) -> Result<(), StageError>;

    /// Run the platform-specific build sequence.
    async fn build(&self, ctx: &BuildContext) -> Result<(), StageError>;

    /// Locate produced artifacts and zip them into `out/`.
    async fn pack(&self, ctx: &BuildContext) -> Result<(), StageError>;
}

pub fn for_platform(platform: Platform) -> Box<dyn PlatformBackend> {
    match platform {
        Platform::Android => Box::new(android::AndroidBackend),
        Platform::Ios | Platform::Osx => Box::new(apple::AppleBackend { target: platform }),
        Platform::Windows => Box::new(windows::WindowsBackend),
        Platform::Ubuntu => Box::new(ubuntu::UbuntuBackend),
    }
}

/// Download signing material into the workspace `certs/` directory.
pub(crate) async fn download_cert(
    ctx: &BuildContext,
    url: &str,
    file_name: &str,
) -> Result<PathBuf, StageError> {
    let dest = ctx.ws.certs_dir().join(file_name);
    fetch_to_file(&ctx.client, url, ctx.config_root.as_deref(), &dest)
        .await
        .map_err(|e| {
            StageError::new(
                format!("downloading signing material {}: {}", file_name, e),
                "The signing key for this build could not be downloaded.",
            )
        })?;
    Ok(dest)
}

/// Collect files under `root` whose path matches `pattern`.
pub(crate) fn collect_matching(root: &Path, pattern: &Regex) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let path = e.path().to_string_lossy().replace('\\', "/");
            pattern.is_match(&path)
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    found.sort();
    found
}

/// Zip `artifacts` into `out/{code}_{platform}_{epochmillis}.zip`.
/// An empty artifact set is a user-visible failure.
pub(crate) async fn pack_artifacts(
    ctx: &BuildContext,
    artifacts: Vec<PathBuf>,
) -> Result<(), StageError> {
    if artifacts.is_empty() {
        return Err(StageError::new(
            format!(
                "no artifacts found for {} under {}",
                ctx.job.platform,
                ctx.ws.project_dir().display()
            ),
            "The build finished but produced no installable artifacts.",
        ));
    }

    let epoch_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let dest = ctx.ws.out_dir().join(format!(
        "{}_{}_{}.zip",
        ctx.job.code, ctx.job.platform, epoch_ms
    ));

    tracing::info!(
        artifacts = artifacts.len(),
        dest = %dest.display(),
        "packing artifacts"
    );
    zip_files(artifacts, dest).await
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
