// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service lifecycle framework.
//!
//! Every service is the same state machine:
//! `Created -> Starting -> Looping -> Stopping -> Stopped`, with a
//! cooperative stop that respects an in-flight iteration. The framework
//! owns the working lock, the service meta file, backend registration,
//! and the 60 s heartbeat; services only implement `tick()`.

use anvil_backend::{external_ip, Backend, BackendError, HostInfo};
use anvil_core::{Clock, Environment, FarmPaths, HostOs};
use anvil_storage::{QueueError, ServiceMeta, WorkingLock};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// How often a stopping service re-checks an in-flight iteration.
pub const STOP_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),
    #[error("cache sync failed: {0}")]
    Sync(String),
    #[error("could not determine state directory")]
    NoStateDir,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Created,
    Starting,
    Looping,
    Stopping,
    Stopped,
}

anvil_core::simple_display! {
    ServiceState {
        Created => "created",
        Starting => "starting",
        Looping => "looping",
        Stopping => "stopping",
        Stopped => "stopped",
    }
}

/// One long-lived worker service.
#[async_trait]
pub trait Service: Send {
    fn id(&self) -> &'static str;

    /// Pause between loop iterations.
    fn interval(&self) -> Duration;

    /// Service-specific initialization, run once before the loop.
    async fn setup(&mut self) -> Result<(), ServiceError> {
        Ok(())
    }

    /// One loop iteration. Errors are logged and swallowed; the loop
    /// always continues.
    async fn tick(&mut self) -> Result<(), ServiceError>;

    /// Service-specific teardown, run once after the loop drains.
    async fn teardown(&mut self) {}
}

/// Drives a [`Service`] through its lifecycle.
pub struct ServiceRunner<S, B, C> {
    service: S,
    env: Environment,
    farm: FarmPaths,
    backend: Arc<B>,
    clock: C,
    state: ServiceState,
    working: WorkingLock,
    /// Externally visible address, resolved at start.
    ip: Option<String>,
}

impl<S, B, C> ServiceRunner<S, B, C>
where
    S: Service,
    B: Backend,
    C: Clock,
{
    pub fn new(service: S, env: Environment, farm: FarmPaths, backend: Arc<B>, clock: C) -> Self {
        let working = WorkingLock::new(&farm, service.id());
        ServiceRunner {
            service,
            env,
            farm,
            backend,
            clock,
            state: ServiceState::Created,
            working,
            ip: None,
        }
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    /// Run until an external stop signal (SIGTERM / ctrl-c).
    pub async fn run(mut self) -> Result<(), ServiceError> {
        self.start().await?;

        let mut ticker = tokio::time::interval(self.service.interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut heartbeat = tokio::time::interval(crate::env::heartbeat_interval());
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        // Registered once; a signal arriving mid-iteration is picked up
        // when the select loop comes back around.
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.run_iteration().await,
                _ = heartbeat.tick() => self.send_heartbeat().await,
                _ = &mut shutdown => break,
            }
        }

        self.stop().await;
        Ok(())
    }

    /// Run `setup` + a single iteration + teardown (one-shot mode).
    pub async fn run_console(mut self) -> Result<(), ServiceError> {
        self.start().await?;
        self.run_iteration().await;
        self.stop().await;
        Ok(())
    }

    async fn start(&mut self) -> Result<(), ServiceError> {
        self.state = ServiceState::Starting;
        tracing::info!(service = self.service.id(), "starting");

        self.farm.ensure_base()?;
        // A previous run that crashed mid-iteration leaves its lock
        // behind; working state always begins false.
        self.working.release()?;

        self.service.setup().await?;

        ServiceMeta {
            pid: std::process::id(),
            started_epoch_ms: self.clock.epoch_ms(),
            version: crate::env::VERSION.to_string(),
        }
        .write(&self.farm, self.service.id())?;

        if self.env.registers_with_backend() {
            self.register().await;
        }

        self.state = ServiceState::Looping;
        tracing::info!(service = self.service.id(), "entering loop");
        Ok(())
    }

    /// Registration is best-effort: failures log an error and the loop
    /// starts regardless.
    async fn register(&mut self) {
        let client = reqwest_client();
        let ip = match external_ip(&client).await {
            Some(ip) => ip,
            None => "127.0.0.1".to_string(),
        };

        let info = HostInfo {
            host: hostname(),
            ip: ip.clone(),
            os: HostOs::current().to_string(),
        };
        if let Err(err) = self.backend.register_host(&info).await {
            tracing::error!(service = self.service.id(), error = %err, "host registration failed");
        }
        if let Err(err) = self.backend.register_service(&ip, self.service.id()).await {
            tracing::error!(service = self.service.id(), error = %err, "service registration failed");
        }
        self.ip = Some(ip);
    }

    async fn run_iteration(&mut self) {
        if self.working.is_held() {
            tracing::trace!(service = self.service.id(), "previous iteration still in flight");
            return;
        }
        if let Err(err) = self.working.acquire() {
            tracing::error!(service = self.service.id(), error = %err, "working lock acquire failed");
            return;
        }

        if let Err(err) = self.service.tick().await {
            // The loop must survive anything a tick throws at it; the
            // external supervisor restarting us would lose the in-flight
            // cleanup guarantees.
            tracing::error!(service = self.service.id(), error = %err, "service iteration failed");
        }

        if let Err(err) = self.working.release() {
            tracing::error!(service = self.service.id(), error = %err, "working lock release failed");
        }
    }

    async fn send_heartbeat(&self) {
        let Some(ip) = &self.ip else {
            return;
        };
        if let Err(err) = self.backend.heartbeat(ip, self.service.id()).await {
            tracing::warn!(service = self.service.id(), error = %err, "heartbeat failed");
        }
    }

    async fn stop(&mut self) {
        self.state = ServiceState::Stopping;
        tracing::info!(service = self.service.id(), "stopping");

        // Cooperative stop: one 5 s timer until any in-flight work
        // (including tasks the service spawned) releases the lock.
        let mut poll = tokio::time::interval(STOP_POLL_INTERVAL);
        poll.tick().await;
        while self.working.is_held() {
            tracing::info!(service = self.service.id(), "busy, delaying stop");
            poll.tick().await;
        }

        self.service.teardown().await;

        if self.env.registers_with_backend() {
            if let Some(ip) = &self.ip {
                if let Err(err) = self.backend.deregister(ip, self.service.id()).await {
                    tracing::warn!(service = self.service.id(), error = %err, "deregistration failed");
                }
            }
        }

        if let Err(err) = ServiceMeta::remove(&self.farm, self.service.id()) {
            tracing::warn!(service = self.service.id(), error = %err, "meta removal failed");
        }

        self.state = ServiceState::Stopped;
        tracing::info!(service = self.service.id(), "stopped");
    }
}

/// Resolves when the process receives SIGTERM or ctrl-c.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut term = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            Ok(term) => term,
            Err(err) => {
                tracing::error!(error = %err, "SIGTERM handler install failed");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn hostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string())
}

fn reqwest_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(anvil_backend::HTTP_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
