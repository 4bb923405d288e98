// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Windows backend.
//!
//! Project names above 40 characters break the native packaging tools,
//! so they are rejected with a user-visible error before anything runs.
//! Signed builds import the PFX through certutil and remove it after
//! the build.

use super::{collect_matching, download_cert, pack_artifacts, PlatformBackend};
use crate::error::StageError;
use crate::BuildContext;
use anvil_adapters::subprocess::{run_logged, TOOL_TIMEOUT};
use anvil_core::SigningKey;
use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;

pub const MAX_PROJECT_NAME_CHARS: usize = 40;

pub const NAME_TOO_LONG_PUBLIC: &str =
    "Windows compilations can't have names longer than 40 characters. Choose a shorter name.";

const PFX_FILE: &str = "signing.pfx";
const ARCHS: &str = "x86 x64 arm";
const APPX_PATTERN: &str = r"(?i)/AppPackages/.*\.(appx|appxbundle|appxupload)$";

pub struct WindowsBackend;

/// Enforced before any native tool runs (the create stage calls this as
/// soon as the project name is known).
pub fn validate_project_name(name: &str) -> Result<(), StageError> {
    let chars = name.chars().count();
    if chars > MAX_PROJECT_NAME_CHARS {
        return Err(StageError::new(
            format!("windows project name has {} characters", chars),
            NAME_TOO_LONG_PUBLIC,
        ));
    }
    Ok(())
}

#[async_trait]
impl PlatformBackend for WindowsBackend {
    async fn build_json(&self, ctx: &BuildContext) -> Result<(), StageError> {
        let Some(SigningKey::Windows {
            pfx,
            thumbprint,
            publisher,
        }) = &ctx.job.key
        else {
            return Ok(());
        };

        let pfx_path = download_cert(ctx, pfx, PFX_FILE).await?;

        let mut cmd = Command::new("certutil");
        cmd.arg("-f").arg("-importPFX").arg(&pfx_path);
        let status = run_logged(
            cmd,
            TOOL_TIMEOUT,
            "certutil -importPFX",
            &ctx.ws.cordova_log(),
        )
        .await?;
        if !status.success() {
            return Err(StageError::new(
                format!("certutil -importPFX exited with {}", status),
                "The Windows signing certificate could not be imported.",
            ));
        }

        let descriptor = serde_json::json!({
            "windows": {
                "release": {
                    "packageCertificateKeyFile": pfx_path,
                    "packageThumbprint": thumbprint,
                    "publisherId": publisher,
                }
            }
        });
        std::fs::write(
            build_json_path(ctx),
            serde_json::to_vec_pretty(&descriptor)
                .map_err(|e| StageError::internal(format!("encoding build.json: {}", e)))?,
        )
        .map_err(|e| StageError::io("writing build.json", e))?;
        Ok(())
    }

    async fn build(&self, ctx: &BuildContext) -> Result<(), StageError> {
        let lib = ctx.native_lib();
        let project_dir = ctx.ws.project_dir();
        let archs = format!("--archs={}", ARCHS);

        let config = build_json_path(ctx);
        let build_config = ctx.job.is_signed().then_some(config.as_path());
        let result = lib
            .compile(
                &project_dir,
                ctx.job.platform,
                true,
                build_config,
                &[archs.as_str()],
            )
            .await;

        // The imported cert never outlives the build, pass or fail.
        if let Some(SigningKey::Windows {
            thumbprint: Some(thumbprint),
            ..
        }) = &ctx.job.key
        {
            remove_imported_cert(ctx, thumbprint).await;
        }

        result
    }

    async fn pack(&self, ctx: &BuildContext) -> Result<(), StageError> {
        let pattern = Regex::new(APPX_PATTERN)
            .map_err(|e| StageError::internal(format!("appx pattern: {}", e)))?;
        let root = ctx.ws.project_dir().join("platforms").join("windows");
        let artifacts = collect_matching(&root, &pattern);
        pack_artifacts(ctx, artifacts).await
    }
}

fn build_json_path(ctx: &BuildContext) -> std::path::PathBuf {
    ctx.ws.dir().join("build.json")
}

async fn remove_imported_cert(ctx: &BuildContext, thumbprint: &str) {
    let mut cmd = Command::new("certutil");
    cmd.arg("-delstore").arg("My").arg(thumbprint);
    match run_logged(
        cmd,
        TOOL_TIMEOUT,
        "certutil -delstore",
        &ctx.ws.cordova_log(),
    )
    .await
    {
        Ok(status) if !status.success() => {
            tracing::warn!(%status, "certificate removal exited nonzero");
        }
        Err(err) => {
            tracing::warn!(error = %err, "certificate removal failed");
        }
        _ => {}
    }
}

#[cfg(test)]
#[path = "windows_tests.rs"]
mod tests;
