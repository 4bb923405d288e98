// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notifier: drains the durable queue, one message per iteration.
//!
//! Delivery is at-least-once: a failed upload leaves the message in
//! flight and the visibility window redelivers it. After 20 redeliveries
//! the message is discarded permanently and the workspace is still
//! cleaned.

use crate::service::{Service, ServiceError};
use anvil_backend::{Backend, ResultUpload};
use anvil_core::{Clock, Environment, FarmPaths, JobWorkspace, Notification};
use anvil_storage::{DurableQueue, Leased};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub const NOTIFIER_SERVICE_ID: &str = "notifier";

/// Redeliveries before a message is discarded permanently.
pub const MAX_RETRIES_NUMBER: u32 = 20;

pub struct NotifierService<B, C> {
    env: Environment,
    farm: FarmPaths,
    backend: Arc<B>,
    clock: C,
    queue: DurableQueue<Notification>,
    machine: String,
    interval: Duration,
}

impl<B: Backend, C: Clock> NotifierService<B, C> {
    pub fn new(
        env: Environment,
        farm: FarmPaths,
        backend: Arc<B>,
        clock: C,
    ) -> Result<NotifierService<B, C>, ServiceError> {
        let queue = DurableQueue::open(farm.queue_dir())?;
        Ok(NotifierService {
            env,
            farm,
            backend,
            clock,
            queue,
            machine: hostname::get()
                .map(|h| h.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "unknown".to_string()),
            interval: crate::env::poll_interval(),
        })
    }

    async fn handle(&self, lease: Leased<Notification>) -> Result<(), ServiceError> {
        let notification = &lease.payload;
        let ws = JobWorkspace::new(&self.farm, &notification.code, notification.starttime);

        // Poison message: give up permanently, but never leak the
        // workspace.
        if lease.tries > MAX_RETRIES_NUMBER {
            tracing::warn!(
                code = %notification.code,
                tries = lease.tries,
                "discarding notification after too many redeliveries"
            );
            self.queue.ack(&lease.id)?;
            self.clean(&ws);
            return Ok(());
        }

        // Malformed legacy message: nothing to upload. Dropping it still
        // releases whatever workspace its name points at.
        if notification.code.is_empty() {
            tracing::warn!("dropping notification without a job code");
            self.queue.ack(&lease.id)?;
            self.clean(&ws);
            return Ok(());
        }

        // Keep the lease alive across the upload.
        self.queue.ping(&lease.id, self.clock.epoch_ms())?;

        let upload = ResultUpload {
            code: notification.code.clone(),
            platform: notification.platform,
            user_error: notification.msg_public.clone(),
            staff_error: notification.msg_internal.clone(),
            machine: self.machine.clone(),
            artifact: ws.first_artifact(),
            log: Some(ws.stdout_log()).filter(|p| p.is_file()),
        };

        match self.backend.post_result(&upload).await {
            Ok(()) => {
                self.queue.ack(&lease.id)?;
                if self.env.retains_workspaces() {
                    tracing::debug!(code = %notification.code, "develop retains workspace");
                } else {
                    self.clean(&ws);
                }
                tracing::info!(code = %notification.code, "result delivered");
            }
            Err(err) => {
                // Left in flight; the visibility window redelivers it.
                tracing::warn!(
                    code = %notification.code,
                    tries = lease.tries,
                    error = %err,
                    "result upload failed, message stays queued"
                );
            }
        }
        Ok(())
    }

    fn clean(&self, ws: &JobWorkspace) {
        if let Err(err) = ws.remove() {
            tracing::warn!(dir = %ws.dir().display(), error = %err, "workspace removal failed");
        }
    }
}

#[async_trait]
impl<B: Backend, C: Clock + Send + 'static> Service for NotifierService<B, C> {
    fn id(&self) -> &'static str {
        NOTIFIER_SERVICE_ID
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn tick(&mut self) -> Result<(), ServiceError> {
        let Some(lease) = self.queue.dequeue(self.clock.epoch_ms())? else {
            return Ok(());
        };
        self.handle(lease).await
    }
}

#[cfg(test)]
#[path = "notifier_tests.rs"]
mod tests;
