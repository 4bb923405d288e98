// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Android backend.
//!
//! Unsigned jobs produce both a debug and a release-unsigned APK (two
//! native build invocations); signed jobs produce a single release APK
//! built against the downloaded keystore.

use super::{collect_matching, download_cert, pack_artifacts, PlatformBackend};
use crate::error::StageError;
use crate::BuildContext;
use anvil_adapters::subprocess::{run_logged, TOOL_TIMEOUT};
use anvil_core::SigningKey;
use async_trait::async_trait;
use regex::Regex;

/// APKs land in the known gradle output directories.
const APK_PATTERN: &str = r"(?i)/outputs/apk/.*\.apk$";

const KEYSTORE_FILE: &str = "release.keystore";

pub struct AndroidBackend;

#[async_trait]
impl PlatformBackend for AndroidBackend {
    async fn build_json(&self, ctx: &BuildContext) -> Result<(), StageError> {
        let Some(SigningKey::Android {
            keystore,
            alias,
            keystorepass,
            aliaspass,
        }) = &ctx.job.key
        else {
            return Ok(());
        };

        let keystore_path = download_cert(ctx, keystore, KEYSTORE_FILE).await?;
        let descriptor = serde_json::json!({
            "android": {
                "release": {
                    "keystore": keystore_path,
                    "storePassword": keystorepass,
                    "alias": alias,
                    "password": aliaspass,
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
        accept_sdk_licenses(ctx).await;

        let lib = ctx.native_lib();
        let project_dir = ctx.ws.project_dir();

        if ctx.job.is_signed() {
            let config = build_json_path(ctx);
            lib.compile(
                &project_dir,
                ctx.job.platform,
                true,
                Some(config.as_path()),
                &[],
            )
            .await
        } else {
            lib.compile(&project_dir, ctx.job.platform, false, None, &[])
                .await?;
            lib.compile(&project_dir, ctx.job.platform, true, None, &[])
                .await
        }
    }

    async fn pack(&self, ctx: &BuildContext) -> Result<(), StageError> {
        let pattern = Regex::new(APK_PATTERN)
            .map_err(|e| StageError::internal(format!("apk pattern: {}", e)))?;
        let root = ctx.ws.project_dir().join("platforms").join("android");
        let artifacts = collect_matching(&root, &pattern);
        pack_artifacts(ctx, artifacts).await
    }
}

fn build_json_path(ctx: &BuildContext) -> std::path::PathBuf {
    ctx.ws.dir().join("build.json")
}

/// Accept Android SDK licenses ahead of the build, best-effort; a build
/// that genuinely needs an unaccepted license will fail on its own with
/// the real error in `cordova.log`.
async fn accept_sdk_licenses(ctx: &BuildContext) {
    #[cfg(unix)]
    {
        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c").arg("yes | sdkmanager --licenses");
        if let Err(err) = run_logged(
            cmd,
            TOOL_TIMEOUT,
            "sdkmanager --licenses",
            &ctx.ws.cordova_log(),
        )
        .await
        {
            tracing::warn!(error = %err, "sdk license acceptance failed");
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctx;
    }
}

#[cfg(test)]
#[path = "android_tests.rs"]
mod tests;
