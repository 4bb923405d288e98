// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! prepare: install engines and plugins, then run native prepare.
//!
//! Only the job's own platform engine is installed; every declared
//! plugin is. All native output lands in `cordova.log`.

use crate::config_xml::ProjectConfig;
use crate::error::StageError;
use crate::BuildContext;

pub async fn run(ctx: &BuildContext, project: &ProjectConfig) -> Result<(), StageError> {
    let lib = ctx.native_lib();
    let project_dir = ctx.ws.project_dir();
    let platform_name = ctx.job.platform.to_string();

    let spec = project
        .engine_for(&platform_name)
        .map(|e| e.install_spec().to_string())
        .unwrap_or_else(|| "latest".to_string());
    lib.platform_add(&project_dir, &platform_name, &spec).await?;

    for plugin in &project.plugins {
        lib.plugin_add(
            &project_dir,
            &plugin.name,
            plugin.install_spec(),
            &plugin.variables,
        )
        .await?;
    }

    lib.prepare(&project_dir, ctx.job.platform).await
}
