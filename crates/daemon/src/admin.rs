// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admin API: read-only status of the sibling services over local TLS.
//!
//! `working` comes from each service's lock file, `started`/`version`
//! from its meta file, cpu/memory from /proc sampling. Logs are the last
//! 100 lines of the per-service stdout log.

use crate::service::{Service, ServiceError};
use anvil_adapters::procinfo;
use anvil_core::{Environment, FarmPaths};
use anvil_storage::{ServiceMeta, WorkingLock};
use async_trait::async_trait;
use axum::extract::{Path as AxumPath, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const ADMIN_SERVICE_ID: &str = "admin";
pub const ADMIN_PORT: u16 = 55555;
pub const LOG_TAIL_LINES: usize = 100;

/// All supervised sibling services, in display order.
pub const SERVICE_IDS: [&str; 4] = ["updater", "builder", "notifier", "admin"];

#[derive(Clone)]
pub struct AdminState {
    pub farm: FarmPaths,
    pub env: Environment,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub name: String,
    pub started: Option<u64>,
    pub working: bool,
    pub cpu: Option<f64>,
    pub memory: Option<u64>,
    pub version: Option<String>,
}

pub fn router(state: AdminState) -> Router {
    Router::new()
        .route("/api/", get(identity))
        .route("/api/services", get(services))
        .route("/api/services/:id", get(service))
        .route("/api/services/:id/log", get(service_log))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

/// Serve over TLS on the fixed admin port.
pub async fn serve(
    state: AdminState,
    addr: SocketAddr,
    cert: PathBuf,
    key: PathBuf,
) -> Result<(), ServiceError> {
    let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert, key)
        .await
        .map_err(ServiceError::Io)?;
    let app = router(state);
    axum_server::bind_rustls(addr, tls)
        .serve(app.into_make_service())
        .await
        .map_err(ServiceError::Io)
}

/// Plain-HTTP fallback for hosts without a TLS identity (develop).
pub async fn serve_insecure(state: AdminState, addr: SocketAddr) -> Result<(), ServiceError> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await.map_err(ServiceError::Io)
}

async fn auth(State(state): State<AdminState>, request: Request, next: Next) -> Response {
    let expected = format!("Bearer {}", state.token);
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if presented != Some(expected.as_str()) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    next.run(request).await
}

async fn identity(State(state): State<AdminState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "anvil",
        "env": state.env,
        "version": crate::env::VERSION,
    }))
}

async fn services(State(state): State<AdminState>) -> Json<Vec<ServiceStatus>> {
    let statuses = SERVICE_IDS
        .iter()
        .map(|id| service_status(&state.farm, id))
        .collect();
    Json(statuses)
}

async fn service(
    State(state): State<AdminState>,
    AxumPath(id): AxumPath<String>,
) -> Response {
    if !SERVICE_IDS.contains(&id.as_str()) {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(service_status(&state.farm, &id)).into_response()
}

async fn service_log(
    State(state): State<AdminState>,
    AxumPath(id): AxumPath<String>,
) -> Response {
    if !SERVICE_IDS.contains(&id.as_str()) {
        return StatusCode::NOT_FOUND.into_response();
    }
    let lines = tail_lines(&state.farm.service_log(&id), LOG_TAIL_LINES);
    lines.join("\n").into_response()
}

fn service_status(farm: &FarmPaths, id: &str) -> ServiceStatus {
    let meta = ServiceMeta::load(farm, id);
    let sample = meta
        .as_ref()
        .map(|m| procinfo::sample(m.pid))
        .unwrap_or_default();

    ServiceStatus {
        name: id.to_string(),
        started: meta.as_ref().map(|m| m.started_epoch_ms),
        working: WorkingLock::is_working(farm, id),
        cpu: sample.cpu_percent,
        memory: sample.memory_bytes,
        version: meta.map(|m| m.version),
    }
}

/// Last `limit` lines of a log file; missing files read as empty.
pub fn tail_lines(path: &std::path::Path, limit: usize) -> Vec<String> {
    let Ok(text) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(limit);
    lines[start..].iter().map(|l| l.to_string()).collect()
}

/// The Admin API as a supervised service: the server runs as a background
/// task; the loop itself only keeps the meta/heartbeat machinery alive.
pub struct AdminService {
    state: AdminState,
    port: u16,
    tls: Option<(PathBuf, PathBuf)>,
}

impl AdminService {
    pub fn new(farm: FarmPaths, env: Environment, token: String) -> AdminService {
        AdminService {
            state: AdminState { farm, env, token },
            port: crate::env::admin_port(),
            tls: crate::env::admin_tls(),
        }
    }
}

#[async_trait]
impl Service for AdminService {
    fn id(&self) -> &'static str {
        ADMIN_SERVICE_ID
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(60)
    }

    async fn setup(&mut self) -> Result<(), ServiceError> {
        let addr = SocketAddr::from(([127, 0, 0, 1], self.port));
        let state = self.state.clone();
        match self.tls.clone() {
            Some((cert, key)) => {
                tokio::spawn(async move {
                    if let Err(err) = serve(state, addr, cert, key).await {
                        tracing::error!(error = %err, "admin api server exited");
                    }
                });
            }
            None => {
                tracing::warn!("no TLS identity configured, serving admin api over plain http");
                tokio::spawn(async move {
                    if let Err(err) = serve_insecure(state, addr).await {
                        tracing::error!(error = %err, "admin api server exited");
                    }
                });
            }
        }
        tracing::info!(port = self.port, "admin api listening");
        Ok(())
    }

    async fn tick(&mut self) -> Result<(), ServiceError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "admin_tests.rs"]
mod tests;
