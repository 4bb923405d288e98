// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! init: establish all on-disk prerequisites.
//!
//! Fetches the project manifest and sources, then makes sure the native
//! build library for the job's `libVersion` is importable from the cache.

use crate::error::StageError;
use crate::BuildContext;
use anvil_backend::fetch_to_file;

pub async fn run(ctx: &BuildContext) -> Result<(), StageError> {
    let config_root = ctx.config_root.as_deref();

    fetch_to_file(
        &ctx.client,
        &ctx.job.config,
        config_root,
        &ctx.ws.config_xml(),
    )
    .await
    .map_err(|e| {
        StageError::new(
            format!("fetching config.xml from {}: {}", ctx.job.config, e),
            "The project configuration could not be downloaded.",
        )
    })?;

    fetch_to_file(
        &ctx.client,
        &ctx.job.source,
        config_root,
        &ctx.ws.source_zip(),
    )
    .await
    .map_err(|e| {
        StageError::new(
            format!("fetching source.zip from {}: {}", ctx.job.source, e),
            "The project sources could not be downloaded.",
        )
    })?;

    let lib = ctx.native_lib();
    if !lib.is_installed() {
        tracing::info!(
            lib_version = %ctx.job.lib_version,
            dir = %lib.dir().display(),
            "native lib not importable, installing"
        );
        lib.install(&ctx.job.lib_version).await?;
    }

    Ok(())
}
