// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Driver for the native build library.
//!
//! The library lives in the shared dependency cache under
//! `data/libs/{libVersion}` and is invoked through its CLI entry point;
//! every invocation appends its output to the job's `cordova.log` so the
//! tail can be surfaced to the user on failure.

use crate::error::StageError;
use anvil_adapters::subprocess::{run_logged, INSTALL_TIMEOUT, TOOL_TIMEOUT};
use anvil_core::Platform;
use std::path::{Path, PathBuf};
use tokio::process::Command;

pub struct NativeLib {
    dir: PathBuf,
    log: PathBuf,
}

impl NativeLib {
    pub fn new(data_dir: &Path, lib_version: &str, log: PathBuf) -> NativeLib {
        NativeLib {
            dir: data_dir.join("libs").join(lib_version),
            log,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn cli_path(&self) -> PathBuf {
        let bin = if cfg!(windows) { "cordova.cmd" } else { "cordova" };
        self.dir.join("node_modules").join(".bin").join(bin)
    }

    /// Whether the library is importable from the cache.
    pub fn is_installed(&self) -> bool {
        self.cli_path().is_file()
    }

    /// Install the library via the host package manager.
    pub async fn install(&self, lib_version: &str) -> Result<(), StageError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StageError::io("creating native lib dir", e))?;

        let mut cmd = Command::new(npm_bin());
        cmd.arg("install")
            .arg("--prefix")
            .arg(&self.dir)
            .arg(format!("cordova@{}", lib_version));
        let context = format!("npm install cordova@{}", lib_version);
        let status = run_logged(cmd, INSTALL_TIMEOUT, &context, &self.log).await?;
        if !status.success() {
            return Err(StageError::new(
                format!("{} exited with {}", context, status),
                format!(
                    "Build library version {} could not be installed on this worker.",
                    lib_version
                ),
            ));
        }
        Ok(())
    }

    pub async fn create_project(
        &self,
        dest: &Path,
        package_id: &str,
        name: &str,
    ) -> Result<(), StageError> {
        let mut cmd = Command::new(self.cli_path());
        cmd.arg("create").arg(dest).arg(package_id).arg(name);
        self.run(cmd, "project create", "The project could not be created.")
            .await
    }

    pub async fn platform_add(
        &self,
        project_dir: &Path,
        engine: &str,
        spec: &str,
    ) -> Result<(), StageError> {
        let mut cmd = Command::new(self.cli_path());
        cmd.arg("platform")
            .arg("add")
            .arg(format!("{}@{}", engine, spec))
            .current_dir(project_dir);
        self.run(
            cmd,
            &format!("platform add {}", engine),
            &format!("The {} platform could not be installed.", engine),
        )
        .await
    }

    pub async fn plugin_add(
        &self,
        project_dir: &Path,
        plugin: &str,
        spec: &str,
        variables: &[(String, String)],
    ) -> Result<(), StageError> {
        let mut cmd = Command::new(self.cli_path());
        cmd.arg("plugin")
            .arg("add")
            .arg(format!("{}@{}", plugin, spec))
            .current_dir(project_dir);
        for (name, value) in variables {
            cmd.arg("--variable").arg(format!("{}={}", name, value));
        }
        self.run(
            cmd,
            &format!("plugin add {}", plugin),
            &format!("The plugin {} could not be installed.", plugin),
        )
        .await
    }

    pub async fn prepare(&self, project_dir: &Path, platform: Platform) -> Result<(), StageError> {
        let mut cmd = Command::new(self.cli_path());
        cmd.arg("prepare").arg(platform.to_string()).current_dir(project_dir);
        self.run(
            cmd,
            "prepare",
            "The project could not be prepared for building.",
        )
        .await
    }

    /// One native build invocation.
    pub async fn compile(
        &self,
        project_dir: &Path,
        platform: Platform,
        release: bool,
        build_config: Option<&Path>,
        extra_args: &[&str],
    ) -> Result<(), StageError> {
        let mut cmd = Command::new(self.cli_path());
        cmd.arg("compile").arg(platform.to_string());
        cmd.arg(if release { "--release" } else { "--debug" });
        if let Some(config) = build_config {
            cmd.arg("--buildConfig").arg(config);
        }
        if !extra_args.is_empty() {
            cmd.arg("--");
            for arg in extra_args {
                cmd.arg(arg);
            }
        }
        cmd.current_dir(project_dir);

        let mode = if release { "release" } else { "debug" };
        self.run(
            cmd,
            &format!("compile {} {}", platform, mode),
            &format!("The {} build failed.", platform),
        )
        .await
    }

    async fn run(&self, cmd: Command, context: &str, public: &str) -> Result<(), StageError> {
        let status = run_logged(cmd, TOOL_TIMEOUT, context, &self.log).await?;
        if !status.success() {
            return Err(StageError::new(
                format!("{} exited with {}", context, status),
                public,
            ));
        }
        Ok(())
    }
}

fn npm_bin() -> &'static str {
    if cfg!(windows) {
        "npm.cmd"
    } else {
        "npm"
    }
}
