// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess helpers with hard timeouts.
//!
//! Every native tool the worker drives (tar, npm, the platform
//! toolchains) runs through one of these two entry points so a hung tool
//! can never wedge a service loop.

use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

/// Archive extraction budget (dependency caches can be large).
pub const EXTRACT_TIMEOUT: Duration = Duration::from_secs(600);

/// Package-manager installs (native lib bootstrap).
pub const INSTALL_TIMEOUT: Duration = Duration::from_secs(900);

/// One native toolchain invocation inside the build child. The overall
/// job budget is enforced separately by the Builder's watchdog.
pub const TOOL_TIMEOUT: Duration = Duration::from_secs(2_400);

#[derive(Debug, Error)]
pub enum SubprocessError {
    #[error("{context} failed to start: {source}")]
    Spawn {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{context} timed out after {timeout:?}")]
    TimedOut { context: String, timeout: Duration },
    #[error("{context} io error: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Run to completion, capturing output, killing the child on timeout.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    context: &str,
) -> Result<Output, SubprocessError> {
    cmd.stdin(Stdio::null());
    cmd.kill_on_drop(true);

    let fut = cmd.output();
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => Err(SubprocessError::Spawn {
            context: context.to_string(),
            source,
        }),
        Err(_) => Err(SubprocessError::TimedOut {
            context: context.to_string(),
            timeout,
        }),
    }
}

/// Run with stdout and stderr streamed line-by-line into `log_path`.
///
/// This is how the build child funnels all native-tool chatter into
/// `cordova.log`: the file is opened in append mode so successive
/// invocations interleave in execution order.
pub async fn run_logged(
    mut cmd: Command,
    timeout: Duration,
    context: &str,
    log_path: &Path,
) -> Result<std::process::ExitStatus, SubprocessError> {
    let io_err = |source| SubprocessError::Io {
        context: context.to_string(),
        source,
    };

    let mut log = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .await
        .map_err(io_err)?;
    log.write_all(format!("$ {}\n", context).as_bytes())
        .await
        .map_err(io_err)?;

    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|source| SubprocessError::Spawn {
        context: context.to_string(),
        source,
    })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let (line_tx, mut line_rx) = tokio::sync::mpsc::channel::<String>(64);

    if let Some(stdout) = stdout {
        let tx = line_tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
        });
    }
    if let Some(stderr) = stderr {
        let tx = line_tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
        });
    }
    drop(line_tx);

    let deadline = tokio::time::Instant::now() + timeout;
    let mut exited = None;
    let status = loop {
        tokio::select! {
            line = line_rx.recv() => {
                match line {
                    Some(line) => {
                        log.write_all(line.as_bytes()).await.map_err(io_err)?;
                        log.write_all(b"\n").await.map_err(io_err)?;
                    }
                    // Readers closed; the child has no more output.
                    None => {
                        break match exited.take() {
                            Some(status) => status,
                            None => child.wait().await.map_err(io_err)?,
                        };
                    }
                }
            }
            status = child.wait(), if exited.is_none() => {
                // Keep draining buffered output after exit.
                exited = Some(status.map_err(io_err)?);
            }
            _ = tokio::time::sleep_until(deadline) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                log.write_all(format!("[{} timed out]\n", context).as_bytes())
                    .await
                    .map_err(io_err)?;
                return Err(SubprocessError::TimedOut {
                    context: context.to_string(),
                    timeout,
                });
            }
        }
    };

    log.flush().await.map_err(io_err)?;
    Ok(status)
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
