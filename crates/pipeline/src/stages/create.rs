// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! create: materialize the native project.
//!
//! Runs the native-lib project creator, lays the application web root
//! over it from the extracted sources, and pulls in referenced assets.

use crate::archive::{copy_tree, extract_zip, find_web_root};
use crate::backends::windows;
use crate::config_xml::{self, ProjectConfig};
use crate::error::StageError;
use crate::BuildContext;
use anvil_backend::fetch_to_file;
use anvil_core::Platform;
use std::path::Path;

const DEFAULT_PACKAGE_ID: &str = "io.anvil.app";

pub async fn run(ctx: &BuildContext) -> Result<ProjectConfig, StageError> {
    let xml = tokio::fs::read_to_string(ctx.ws.config_xml())
        .await
        .map_err(|e| StageError::io("reading config.xml", e))?;
    let project = config_xml::parse(&xml).map_err(|e| {
        StageError::new(
            format!("parsing config.xml: {}", e),
            "The project config.xml is invalid.",
        )
    })?;

    // Windows rejects long project names before any tool runs.
    if ctx.job.platform == Platform::Windows {
        windows::validate_project_name(&project.name)?;
    }

    let project_dir = ctx.ws.project_dir();
    let lib = ctx.native_lib();
    lib.create_project(
        &project_dir,
        project.id.as_deref().unwrap_or(DEFAULT_PACKAGE_ID),
        &project.name,
    )
    .await?;

    // The job's manifest replaces whatever the creator scaffolded.
    tokio::fs::copy(ctx.ws.config_xml(), project_dir.join("config.xml"))
        .await
        .map_err(|e| StageError::io("copying config.xml into project", e))?;

    // Extract sources and locate the web root by its index.html.
    let tmp = ctx.ws.tmp_dir();
    extract_zip(&ctx.ws.source_zip(), &tmp).await?;
    let web_root = find_web_root(&tmp).ok_or_else(|| {
        StageError::new(
            "no index.html found in source package",
            "The source package does not contain an index.html file.",
        )
    })?;

    let www = project_dir.join("www");
    if www.exists() {
        std::fs::remove_dir_all(&www).map_err(|e| StageError::io("clearing www", e))?;
    }
    copy_tree(&web_root, &www).map_err(|e| StageError::io("copying web root", e))?;

    // Asset paths referenced by the manifest, plus the conventional
    // hooks/ and node_modules/ subtrees when the sources carry them.
    for rel in project.icons.iter().chain(project.splashes.iter()) {
        copy_referenced(&web_root, &tmp, rel, &project_dir)?;
    }
    for subtree in ["hooks", "node_modules"] {
        copy_referenced(&web_root, &tmp, subtree, &project_dir)?;
    }

    // Job-level icon/splash overrides, fetched next to the project.
    if let Some(url) = &ctx.job.icon {
        fetch_asset(ctx, url, &ctx.ws.icons_dir(), "icon.png").await?;
    }
    if let Some(url) = &ctx.job.splash {
        fetch_asset(ctx, url, &ctx.ws.splashes_dir(), "splash.png").await?;
    }

    Ok(project)
}

/// Copy a path referenced by the manifest into the project, preserving
/// its relative location. Resolution tries the web root first, then the
/// extraction root. Absent paths are skipped.
fn copy_referenced(
    web_root: &Path,
    tmp: &Path,
    rel: &str,
    project_dir: &Path,
) -> Result<(), StageError> {
    let src = [web_root.join(rel), tmp.join(rel)]
        .into_iter()
        .find(|p| p.exists());
    let Some(src) = src else {
        return Ok(());
    };

    let dst = project_dir.join(rel);
    if src.is_dir() {
        copy_tree(&src, &dst).map_err(|e| StageError::io("copying referenced tree", e))?;
    } else {
        if let Some(parent) = dst.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StageError::io("creating asset dir", e))?;
        }
        std::fs::copy(&src, &dst).map_err(|e| StageError::io("copying referenced file", e))?;
    }
    Ok(())
}

async fn fetch_asset(
    ctx: &BuildContext,
    url: &str,
    dir: &Path,
    fallback_name: &str,
) -> Result<(), StageError> {
    let name = url
        .rsplit('/')
        .next()
        .filter(|n| !n.is_empty())
        .unwrap_or(fallback_name);
    fetch_to_file(
        &ctx.client,
        url,
        ctx.config_root.as_deref(),
        &dir.join(name),
    )
    .await
    .map_err(|e| {
        StageError::new(
            format!("fetching asset {}: {}", url, e),
            "A project icon or splash image could not be downloaded.",
        )
    })
}
