// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builder: pulls one job at a time and supervises its build child.
//!
//! The child is a fresh process running the pipeline; it reports exactly
//! one terminal message through the workspace IPC file. A single-shot
//! watchdog SIGKILLs the child at the hard wall-clock budget. Whichever
//! of {IPC message, child exit, watchdog, spawn error} fires first is
//! authoritative; the `tokio::select!` race is the once-latch. Exactly
//! one notification is enqueued per processed job.

use crate::service::{Service, ServiceError};
use anvil_adapters::redact_paths;
use anvil_backend::Backend;
use anvil_core::{
    Clock, Environment, FarmPaths, Job, JobWorkspace, Notification, Platform, TerminalMessage,
};
use anvil_storage::{DurableQueue, ReadyMarker};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

pub const BUILDER_SERVICE_ID: &str = "builder";

/// Hard wall-clock budget for one build child: 45 minutes.
pub const BUILD_TIMEOUT: Duration = Duration::from_millis(2_700_000);

pub const WATCHDOG_INTERNAL_MSG: &str = "Compilation took too long, killing...";
pub const WATCHDOG_PUBLIC_MSG: &str = "The compilation exceed the designated time.";

/// How much of the native build log is surfaced to the user on failure.
pub const CORDOVA_LOG_TAIL_BYTES: u64 = 10_000;

const SPAWN_PUBLIC_MSG: &str = "The compilation could not be started on this worker.";

/// How often the supervisor polls for the child's IPC file.
const IPC_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct BuilderService<B, C> {
    env: Environment,
    farm: FarmPaths,
    backend: Arc<B>,
    clock: C,
    queue: DurableQueue<Notification>,
    ready: ReadyMarker,
    platforms: Vec<Platform>,
    /// Config root for one-shot jobs (relative asset resolution).
    config_root: Option<PathBuf>,
    log_level: String,
    build_timeout: Duration,
    interval: Duration,
}

impl<B: Backend, C: Clock> BuilderService<B, C> {
    pub fn new(
        env: Environment,
        farm: FarmPaths,
        backend: Arc<B>,
        clock: C,
        log_level: impl Into<String>,
    ) -> Result<BuilderService<B, C>, ServiceError> {
        let queue = DurableQueue::open(farm.queue_dir())?;
        let ready = ReadyMarker::new(&farm);
        Ok(BuilderService {
            env,
            farm,
            backend,
            clock,
            queue,
            ready,
            platforms: crate::env::platforms(),
            config_root: None,
            log_level: log_level.into(),
            build_timeout: crate::env::build_timeout(),
            interval: crate::env::poll_interval(),
        })
    }

    pub fn with_config_root(mut self, root: Option<PathBuf>) -> Self {
        self.config_root = root;
        self
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn with_build_timeout(mut self, timeout: Duration) -> Self {
        self.build_timeout = timeout;
        self
    }

    /// One-shot mode: build the job described by `{path}/config.json`.
    /// Returns true when the build succeeded.
    pub async fn run_once(&self, path: &Path) -> Result<bool, ServiceError> {
        let payload: Value = serde_json::from_slice(&std::fs::read(path.join("config.json"))?)?;
        self.process_payload(payload).await
    }

    /// Validate, stage, build, and notify one job payload.
    /// Returns true when the build succeeded.
    async fn process_payload(&self, payload: Value) -> Result<bool, ServiceError> {
        let starttime = self.clock.epoch_ms();

        // Bind the acquisition timestamp into the payload so the child
        // (and the persisted config.json) can rederive the workspace.
        let mut payload = payload;
        if let Some(obj) = payload.as_object_mut() {
            obj.insert("starttime".to_string(), Value::from(starttime));
        }

        let job = match Job::from_json(payload.clone(), starttime) {
            Ok(job) => job,
            Err(err) => {
                // Input error: no retry; notify when the payload is
                // addressable, otherwise all we can do is log it.
                tracing::error!(error = %err, "rejecting malformed job payload");
                if let Some((code, platform)) = addressable(&payload) {
                    self.queue.push(
                        &Notification::failure(
                            code,
                            platform,
                            starttime,
                            err.to_string(),
                            format!("The build request is invalid: {}", err),
                        ),
                        starttime,
                    )?;
                }
                return Ok(false);
            }
        };

        tracing::info!(code = %job.code, platform = %job.platform, starttime, "job acquired");

        let ws = JobWorkspace::new(&self.farm, &job.code, job.starttime);
        ws.create()?;
        ws.write_config_json(&job.raw)?;

        let outcome = self.run_child(&job, &ws).await;
        let success = outcome.is_success();

        let notification = match outcome {
            TerminalMessage::Success => {
                Notification::success(&job.code, job.platform, job.starttime)
            }
            TerminalMessage::Failure {
                message,
                msg_public,
            } => Notification::failure(
                &job.code,
                job.platform,
                job.starttime,
                message,
                append_cordova_tail(msg_public, &ws),
            ),
        };
        self.queue.push(&notification, self.clock.epoch_ms())?;
        tracing::info!(code = %job.code, success, "notification enqueued");

        Ok(success)
    }

    async fn run_child(&self, job: &Job, ws: &JobWorkspace) -> TerminalMessage {
        let cmd = match self.child_command(job) {
            Ok(cmd) => cmd,
            Err(err) => {
                return TerminalMessage::failure(
                    format!("resolving worker binary failed: {}", err),
                    SPAWN_PUBLIC_MSG,
                )
            }
        };
        supervise_child(cmd, ws, self.build_timeout).await
    }

    fn child_command(&self, job: &Job) -> std::io::Result<Command> {
        let exe = std::env::current_exe()?;
        let mut cmd = Command::new(exe);
        cmd.arg("build")
            .arg("--env")
            .arg(self.env.to_string())
            .arg("--log-level")
            .arg(&self.log_level)
            .arg("--json")
            .arg(job.raw.to_string());
        if let Some(root) = &self.config_root {
            cmd.arg("--path").arg(root);
        }
        Ok(cmd)
    }
}

#[async_trait]
impl<B: Backend, C: Clock + Send + 'static> Service for BuilderService<B, C> {
    fn id(&self) -> &'static str {
        BUILDER_SERVICE_ID
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn tick(&mut self) -> Result<(), ServiceError> {
        // Gate: no jobs before the Updater's first completed sync.
        if !self.ready.exists() {
            tracing::trace!("cache not ready, skipping poll");
            return Ok(());
        }

        crate::disk::ensure_headroom().await;

        let Some(payload) = self.backend.fetch_job(&self.platforms).await? else {
            return Ok(());
        };
        self.process_payload(payload).await?;
        Ok(())
    }
}

/// Spawn and supervise one build child; the select race is the
/// once-latch deciding the authoritative terminal state.
pub(crate) async fn supervise_child(
    mut cmd: Command,
    ws: &JobWorkspace,
    timeout: Duration,
) -> TerminalMessage {
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            return TerminalMessage::failure(
                format!("spawning build child failed: {}", err),
                SPAWN_PUBLIC_MSG,
            )
        }
    };

    // Capture and redact child output into stdout.log. Runs as its own
    // task so a chatty child never backs up against the supervisor loop.
    let capture = tokio::spawn(spawn_output_capture(&mut child, ws));

    let ipc_path = ws.ipc_path();
    let watchdog = tokio::time::sleep(timeout);
    tokio::pin!(watchdog);
    let mut ipc_poll = tokio::time::interval(IPC_POLL_INTERVAL);

    let outcome = loop {
        tokio::select! {
            // Watchdog: SIGKILL and synthesize the timeout error.
            _ = &mut watchdog => {
                tracing::error!("build watchdog fired, killing child");
                let _ = child.start_kill();
                let _ = child.wait().await;
                break TerminalMessage::failure(WATCHDOG_INTERNAL_MSG, WATCHDOG_PUBLIC_MSG);
            }

            // Child exited: its IPC message (written before exit) is
            // authoritative; otherwise synthesize from the exit status.
            status = child.wait() => {
                match status {
                    Ok(status) => {
                        if let Some(msg) = TerminalMessage::read(&ipc_path) {
                            break msg;
                        }
                        if status.success() {
                            break TerminalMessage::Success;
                        }
                        let text = format!(
                            "Process exited abnormally ({}): {}",
                            exit_signal(&status),
                            status.code().unwrap_or(-1)
                        );
                        break TerminalMessage::failure(text.clone(), text);
                    }
                    Err(err) => {
                        let text = format!("waiting for build child failed: {}", err);
                        break TerminalMessage::failure(text, SPAWN_PUBLIC_MSG);
                    }
                }
            }

            // IPC message ahead of exit: it wins; reap the child.
            _ = ipc_poll.tick() => {
                if let Some(msg) = TerminalMessage::read(&ipc_path) {
                    if tokio::time::timeout(Duration::from_secs(10), child.wait())
                        .await
                        .is_err()
                    {
                        tracing::warn!("child lingered after terminal message, killing");
                        let _ = child.start_kill();
                        let _ = child.wait().await;
                    }
                    break msg;
                }
            }
        }
    };

    let _ = capture.await;
    outcome
}

/// Stream the child's redacted stdout/stderr to the service log and the
/// workspace `stdout.log`.
fn spawn_output_capture(
    child: &mut tokio::process::Child,
    ws: &JobWorkspace,
) -> impl std::future::Future<Output = ()> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let log_path = ws.stdout_log();
    let ws_dir = ws.dir().to_path_buf();
    let home = home_dir();

    async move {
        let mut log = match tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .await
        {
            Ok(log) => log,
            Err(err) => {
                tracing::error!(error = %err, "opening stdout.log failed");
                return;
            }
        };

        let (tx, mut rx) = tokio::sync::mpsc::channel::<String>(64);
        if let Some(stdout) = stdout {
            forward_lines(stdout, tx.clone());
        }
        if let Some(stderr) = stderr {
            forward_lines(stderr, tx.clone());
        }
        drop(tx);

        while let Some(line) = rx.recv().await {
            let mut secrets: Vec<&Path> = vec![&ws_dir];
            if let Some(home) = &home {
                secrets.push(home);
            }
            let clean = redact_paths(&line, &secrets);
            tracing::info!(target: "anvil::child", "{}", clean);
            if log.write_all(clean.as_bytes()).await.is_ok() {
                let _ = log.write_all(b"\n").await;
            }
        }
        let _ = log.flush().await;
    }
}

fn forward_lines(
    reader: impl tokio::io::AsyncRead + Unpin + Send + 'static,
    tx: tokio::sync::mpsc::Sender<String>,
) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).await.is_err() {
                break;
            }
        }
    });
}

/// Best-effort code/platform extraction from a payload that failed
/// validation, so the failure can still be notified.
fn addressable(payload: &Value) -> Option<(String, Platform)> {
    let code = payload.get("code")?.as_str()?.to_string();
    let platform: Platform = payload
        .get("platforms")?
        .as_array()?
        .first()?
        .get("name")?
        .as_str()?
        .parse()
        .ok()?;
    Some((code, platform))
}

/// Append the native log tail to the user-visible message.
pub(crate) fn append_cordova_tail(msg_public: String, ws: &JobWorkspace) -> String {
    match tail_bytes(&ws.cordova_log(), CORDOVA_LOG_TAIL_BYTES) {
        Some(tail) if !tail.trim().is_empty() => {
            format!("{}\nCORDOVA LOG:\n{}", msg_public, tail)
        }
        _ => msg_public,
    }
}

/// Last `limit` bytes of a file, lossily decoded.
pub(crate) fn tail_bytes(path: &Path, limit: u64) -> Option<String> {
    let bytes = std::fs::read(path).ok()?;
    let start = bytes.len().saturating_sub(limit as usize);
    Some(String::from_utf8_lossy(&bytes[start..]).into_owned())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .ok()
        .map(PathBuf::from)
}

#[cfg(unix)]
fn exit_signal(status: &std::process::ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;
    status
        .signal()
        .map(|s| format!("signal {}", s))
        .unwrap_or_else(|| "no signal".to_string())
}

#[cfg(not(unix))]
fn exit_signal(_status: &std::process::ExitStatus) -> String {
    "no signal".to_string()
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;
