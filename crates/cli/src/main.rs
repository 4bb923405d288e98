// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `anvil` - build farm worker entry point.
//!
//! One subcommand per service plus the `build` child the Builder spawns.
//! Daemon mode loops under the lifecycle framework; `--console` runs a
//! single iteration and exits 0 on success, -1 on any fatal error.

mod logging;

use anvil_backend::HttpBackend;
use anvil_core::{Clock, Environment, FarmPaths, Job, JobWorkspace, SystemClock, TerminalMessage};
use anvil_daemon::{
    env as daemon_env, AdminService, BuilderService, NotifierService, Service, ServiceRunner,
    UpdaterService,
};
use anvil_pipeline::BuildContext;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use logging::LogLevel;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "anvil", version, about = "Anvil mobile build farm worker")]
struct Cli {
    /// Deployment environment.
    #[arg(long, global = true, default_value = "develop")]
    env: Environment,

    /// Log verbosity.
    #[arg(long = "log-level", global = true, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// One-shot mode: run a single iteration, then exit.
    #[arg(long, global = true)]
    console: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sync the dependency cache against the remote object store.
    Updater,
    /// Poll for jobs and drive build children.
    Builder {
        /// One-shot job directory containing config.json.
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Drain the notification queue to the backend.
    Notifier,
    /// Serve sibling service status over local TLS.
    Admin,
    /// Run one build pipeline (spawned by the Builder).
    Build {
        /// Job payload JSON.
        #[arg(long)]
        json: String,
        /// Config root for relative asset paths.
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("anvil: runtime init failed: {}", err);
            std::process::exit(-1);
        }
    };

    let code = match runtime.block_on(run(cli)) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %format!("{:#}", err), "fatal");
            eprintln!("anvil: {:#}", err);
            -1
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    let state_dir = daemon_env::state_dir().context("resolving state directory")?;
    let farm = FarmPaths::new(&state_dir, cli.env);
    farm.ensure_base().context("creating farm directories")?;

    let service_id = match &cli.command {
        Command::Updater => Some("updater"),
        Command::Builder { .. } => Some("builder"),
        Command::Notifier => Some("notifier"),
        Command::Admin => Some("admin"),
        Command::Build { .. } => None,
    };
    let log_file = service_id.map(|id| farm.service_log(id));
    logging::init(
        cli.log_level,
        log_file.as_deref().filter(|_| !cli.console),
    );

    let backend = Arc::new(HttpBackend::new(
        daemon_env::backend_url(cli.env),
        daemon_env::api_token(),
    ));

    match cli.command {
        Command::Updater => {
            let bucket = daemon_env::bucket(cli.env);
            let store = object_store::aws::AmazonS3Builder::from_env()
                .with_bucket_name(&bucket)
                .build()
                .with_context(|| format!("opening object store bucket {}", bucket))?;
            let service = UpdaterService::new(farm.clone(), Arc::new(store));
            run_service(service, cli.env, farm, backend, cli.console).await
        }
        Command::Builder { path } => {
            let service = BuilderService::new(
                cli.env,
                farm.clone(),
                Arc::clone(&backend),
                SystemClock,
                cli.log_level.as_arg(),
            )?
            .with_config_root(path.clone());

            // One-shot: build the supplied job and report via exit code.
            if let Some(path) = path {
                let success = service.run_once(&path).await?;
                return Ok(if success { 0 } else { -1 });
            }
            run_service(service, cli.env, farm, backend, cli.console).await
        }
        Command::Notifier => {
            let service =
                NotifierService::new(cli.env, farm.clone(), Arc::clone(&backend), SystemClock)?;
            run_service(service, cli.env, farm, backend, cli.console).await
        }
        Command::Admin => {
            let service = AdminService::new(farm.clone(), cli.env, daemon_env::api_token());
            run_service(service, cli.env, farm, backend, cli.console).await
        }
        Command::Build { json, path } => run_build_child(cli.env, &state_dir, json, path).await,
    }
}

async fn run_service<S: Service>(
    service: S,
    env: Environment,
    farm: FarmPaths,
    backend: Arc<HttpBackend>,
    console: bool,
) -> Result<i32> {
    let runner = ServiceRunner::new(service, env, farm, backend, SystemClock);
    if console {
        runner.run_console().await?;
    } else {
        runner.run().await?;
    }
    Ok(0)
}

/// The crash-isolated build child: run the pipeline, write exactly one
/// terminal message, exit.
async fn run_build_child(
    env: Environment,
    state_dir: &std::path::Path,
    json: String,
    config_root: Option<PathBuf>,
) -> Result<i32> {
    let payload: serde_json::Value =
        serde_json::from_str(&json).context("parsing job payload")?;
    let starttime = payload
        .get("starttime")
        .and_then(serde_json::Value::as_u64)
        .unwrap_or_else(|| SystemClock.epoch_ms());
    let job = Job::from_json(payload, starttime).context("validating job payload")?;

    let farm = FarmPaths::new(state_dir, env);
    let ws = JobWorkspace::new(&farm, &job.code, job.starttime);
    ws.create().context("creating workspace")?;
    let ipc_path = ws.ipc_path();

    let ctx = BuildContext {
        env,
        job,
        ws,
        data_dir: farm.data_dir(),
        config_root,
        client: reqwest::Client::new(),
    };

    let message = match anvil_pipeline::run(&ctx).await {
        Ok(()) => TerminalMessage::Success,
        Err(err) => {
            tracing::error!(error = %err.message, "pipeline failed");
            err.into_terminal()
        }
    };

    message
        .write_atomic(&ipc_path)
        .context("writing terminal message")?;
    Ok(if message.is_success() { 0 } else { -1 })
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
