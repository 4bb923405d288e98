// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! anvil-pipeline: the build child.
//!
//! One job runs through five sequential stages (init, create, prepare,
//! build, pack) inside a crash-isolated child process. Any stage failure
//! terminates the pipeline with a two-audience [`StageError`]; the parent
//! Builder turns it into the job's terminal notification.

pub mod archive;
pub mod backends;
pub mod config_xml;
pub mod error;
pub mod native;
pub mod stages;

pub use backends::PlatformBackend;
pub use error::StageError;

use anvil_core::{Environment, Job, JobWorkspace};
use std::path::PathBuf;

/// Everything a pipeline run needs.
pub struct BuildContext {
    pub env: Environment,
    pub job: Job,
    pub ws: JobWorkspace,
    /// The shared dependency cache (`data/`), populated by the Updater.
    pub data_dir: PathBuf,
    /// Root for resolving relative asset paths in one-shot mode.
    pub config_root: Option<PathBuf>,
    pub client: reqwest::Client,
}

impl BuildContext {
    /// The native-lib driver for this job's `libVersion`.
    pub fn native_lib(&self) -> native::NativeLib {
        native::NativeLib::new(&self.data_dir, &self.job.lib_version, self.ws.cordova_log())
    }
}

/// Run the full pipeline for one job.
pub async fn run(ctx: &BuildContext) -> Result<(), StageError> {
    stages::init::run(ctx).await?;
    let project = stages::create::run(ctx).await?;
    stages::prepare::run(ctx, &project).await?;

    let backend = backends::for_platform(ctx.job.platform);
    stages::build::run(ctx, backend.as_ref()).await?;
    stages::pack::run(ctx, backend.as_ref()).await
}
