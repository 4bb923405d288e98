// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable at-least-once queue with visibility timeouts.
//!
//! One JSON envelope file per message. A dequeue leases the message: its
//! `tries` counter is bumped and it becomes invisible for the visibility
//! window, all persisted before the caller sees the payload. A consumer
//! that crashes mid-job simply lets the window lapse and the message is
//! redelivered. `ack` removes permanently; `ping` extends the lease.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// How long a dequeued message stays invisible to other consumers.
pub const DEFAULT_VISIBILITY: Duration = Duration::from_secs(1_800);

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("queue serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("unknown message: {0}")]
    UnknownMessage(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    id: String,
    tries: u32,
    pushed_at_ms: u64,
    visible_at_ms: u64,
    payload: T,
}

/// A leased message. `tries` counts deliveries including this one.
#[derive(Debug)]
pub struct Leased<T> {
    pub id: String,
    pub tries: u32,
    pub payload: T,
}

/// File-backed durable queue.
pub struct DurableQueue<T> {
    dir: PathBuf,
    visibility: Duration,
    _payload: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> DurableQueue<T> {
    /// Open (creating if needed) a queue directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<DurableQueue<T>, QueueError> {
        Self::with_visibility(dir, DEFAULT_VISIBILITY)
    }

    pub fn with_visibility(
        dir: impl Into<PathBuf>,
        visibility: Duration,
    ) -> Result<DurableQueue<T>, QueueError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(DurableQueue {
            dir,
            visibility,
            _payload: PhantomData,
        })
    }

    /// Append a message. Returns its id.
    pub fn push(&self, payload: &T, now_ms: u64) -> Result<String, QueueError> {
        let id = uuid::Uuid::new_v4().to_string();
        let envelope = Envelope {
            id: id.clone(),
            tries: 0,
            pushed_at_ms: now_ms,
            visible_at_ms: now_ms,
            payload,
        };
        crate::write_atomic(
            &self.envelope_path(&id),
            &serde_json::to_vec_pretty(&envelope)?,
        )?;
        Ok(id)
    }

    /// Lease the oldest visible message, if any.
    ///
    /// The bumped `tries` and new visibility deadline hit disk before the
    /// payload is returned, so a consumer crash can only ever delay a
    /// message, never lose its delivery count.
    pub fn dequeue(&self, now_ms: u64) -> Result<Option<Leased<T>>, QueueError> {
        let mut candidate: Option<Envelope<T>> = None;
        for path in self.envelope_files()? {
            let envelope: Envelope<T> = match self.read_envelope(&path) {
                Ok(e) => e,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "quarantining unreadable queue envelope");
                    let _ = std::fs::rename(&path, path.with_extension("corrupt"));
                    continue;
                }
            };
            if envelope.visible_at_ms > now_ms {
                continue;
            }
            let older = candidate
                .as_ref()
                .map(|c| envelope.pushed_at_ms < c.pushed_at_ms)
                .unwrap_or(true);
            if older {
                candidate = Some(envelope);
            }
        }

        let Some(mut envelope) = candidate else {
            return Ok(None);
        };

        envelope.tries += 1;
        envelope.visible_at_ms = now_ms + self.visibility.as_millis() as u64;
        crate::write_atomic(
            &self.envelope_path(&envelope.id),
            &serde_json::to_vec_pretty(&envelope)?,
        )?;

        Ok(Some(Leased {
            id: envelope.id,
            tries: envelope.tries,
            payload: envelope.payload,
        }))
    }

    /// Permanently remove a message.
    pub fn ack(&self, id: &str) -> Result<(), QueueError> {
        let path = self.envelope_path(id);
        if !path.exists() {
            return Err(QueueError::UnknownMessage(id.to_string()));
        }
        std::fs::remove_file(path)?;
        Ok(())
    }

    /// Extend a leased message's visibility by the full window.
    pub fn ping(&self, id: &str, now_ms: u64) -> Result<(), QueueError> {
        let path = self.envelope_path(id);
        if !path.exists() {
            return Err(QueueError::UnknownMessage(id.to_string()));
        }
        let mut envelope: Envelope<T> = self.read_envelope(&path)?;
        envelope.visible_at_ms = now_ms + self.visibility.as_millis() as u64;
        crate::write_atomic(&path, &serde_json::to_vec_pretty(&envelope)?)?;
        Ok(())
    }

    /// Number of messages on disk, visible or not.
    pub fn len(&self) -> Result<usize, QueueError> {
        Ok(self.envelope_files()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, QueueError> {
        Ok(self.len()? == 0)
    }

    fn envelope_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn envelope_files(&self) -> Result<Vec<PathBuf>, QueueError> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();
        Ok(files)
    }

    fn read_envelope(&self, path: &Path) -> Result<Envelope<T>, QueueError> {
        Ok(serde_json::from_slice(&std::fs::read(path)?)?)
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
