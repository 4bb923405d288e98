// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ubuntu backend: unsigned debuild, packaged .debs.

use super::{collect_matching, pack_artifacts, PlatformBackend};
use crate::error::StageError;
use crate::BuildContext;
use anvil_adapters::subprocess::{run_logged, TOOL_TIMEOUT};
use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;

const DEB_PATTERN: &str = r"(?i)\.deb$";

pub struct UbuntuBackend;

#[async_trait]
impl PlatformBackend for UbuntuBackend {
    async fn build_json(&self, _ctx: &BuildContext) -> Result<(), StageError> {
        // debuild takes its signing flags on the command line.
        Ok(())
    }

    async fn build(&self, ctx: &BuildContext) -> Result<(), StageError> {
        let mut cmd = Command::new("debuild");
        cmd.arg("-i")
            .arg("-us")
            .arg("-uc")
            .arg("-b")
            .current_dir(ctx.ws.project_dir());

        let status = run_logged(cmd, TOOL_TIMEOUT, "debuild", &ctx.ws.cordova_log()).await?;
        if !status.success() {
            return Err(StageError::new(
                format!("debuild exited with {}", status),
                "The ubuntu build failed.",
            ));
        }
        Ok(())
    }

    async fn pack(&self, ctx: &BuildContext) -> Result<(), StageError> {
        // debuild drops packages next to the source directory.
        let pattern = Regex::new(DEB_PATTERN)
            .map_err(|e| StageError::internal(format!("deb pattern: {}", e)))?;
        let artifacts = collect_matching(ctx.ws.dir(), &pattern);
        pack_artifacts(ctx, artifacts).await
    }
}
