// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tracing-subscriber setup.
//!
//! Daemon services tee their output into `{service_id}.log` under the
//! farm root so the Admin API can serve the tail; `--console` runs log
//! to stdout only.

use clap::ValueEnum;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Wire-compatible log level names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum LogLevel {
    All,
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Mark,
    Off,
}

impl LogLevel {
    /// Map onto a tracing directive. `fatal` and `mark` have no tracing
    /// equivalent and collapse to `error`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::All | LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error | LogLevel::Fatal | LogLevel::Mark => "error",
            LogLevel::Off => "off",
        }
    }

    /// The name services hand to their build children.
    pub fn as_arg(&self) -> &'static str {
        match self {
            LogLevel::All => "all",
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Fatal => "fatal",
            LogLevel::Mark => "mark",
            LogLevel::Off => "off",
        }
    }
}

/// Initialize the global subscriber, optionally teeing to a log file.
pub fn init(level: LogLevel, log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    let file = log_file.and_then(|path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| eprintln!("anvil: cannot open log file {}: {}", path.display(), err))
            .ok()
    });

    match file {
        Some(file) => {
            let writer = std::io::stdout.and(Arc::new(file));
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
