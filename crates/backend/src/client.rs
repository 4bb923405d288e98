// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend API client.

use anvil_core::Platform;
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Per-request budget for backend calls.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Host identity sent at registration.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct HostInfo {
    pub host: String,
    pub ip: String,
    pub os: String,
}

/// One terminal result upload: the `data` form field plus optional
/// artifact and log attachments (skipped when the files are absent).
#[derive(Debug, Clone)]
pub struct ResultUpload {
    pub code: String,
    pub platform: Platform,
    pub user_error: Option<String>,
    pub staff_error: Option<String>,
    pub machine: String,
    pub artifact: Option<PathBuf>,
    pub log: Option<PathBuf>,
}

impl ResultUpload {
    /// The JSON `data` form field.
    pub fn data_json(&self) -> Value {
        serde_json::json!({
            "platform": self.platform,
            "user_error": self.user_error,
            "staff_error": self.staff_error,
            "machine": self.machine,
        })
    }
}

/// The backend operations the services consume.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Ask for one queued job buildable on this host.
    /// `None` when the queue is empty.
    async fn fetch_job(&self, platforms: &[Platform]) -> Result<Option<Value>, BackendError>;

    /// Upload a terminal result. Success covers 2xx and 3xx responses.
    async fn post_result(&self, upload: &ResultUpload) -> Result<(), BackendError>;

    async fn register_host(&self, info: &HostInfo) -> Result<(), BackendError>;
    async fn register_service(&self, ip: &str, service_id: &str) -> Result<(), BackendError>;
    async fn heartbeat(&self, ip: &str, service_id: &str) -> Result<(), BackendError>;
    async fn deregister(&self, ip: &str, service_id: &str) -> Result<(), BackendError>;
}

/// reqwest-backed production client.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> HttpBackend {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .use_rustls_tls()
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        HttpBackend {
            base_url: base_url.into(),
            token: token.into(),
            client,
        }
    }

    /// The shared client, reused for asset downloads.
    pub fn http_client(&self) -> &reqwest::Client {
        &self.client
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if status.is_success() || status.is_redirection() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(BackendError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn fetch_job(&self, platforms: &[Platform]) -> Result<Option<Value>, BackendError> {
        let response = self
            .client
            .post(self.url("/api/v1/compilation"))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "platforms": platforms }))
            .send()
            .await?;
        let response = Self::check(response).await?;

        let body = response.text().await?;
        if body.trim().is_empty() || body.trim() == "null" {
            return Ok(None);
        }
        let value: Value = serde_json::from_str(&body).map_err(|e| BackendError::Status {
            status: 200,
            body: format!("unparseable job payload: {}", e),
        })?;
        Ok(Some(value))
    }

    async fn post_result(&self, upload: &ResultUpload) -> Result<(), BackendError> {
        let mut form = reqwest::multipart::Form::new()
            .text("data", upload.data_json().to_string());

        if let Some(path) = &upload.artifact {
            if path.is_file() {
                let bytes = tokio::fs::read(path).await?;
                let name = file_name(path, "result.zip");
                form = form.part(
                    "result",
                    reqwest::multipart::Part::bytes(bytes)
                        .file_name(name)
                        .mime_str("application/zip")?,
                );
            }
        }
        if let Some(path) = &upload.log {
            if path.is_file() {
                let bytes = tokio::fs::read(path).await?;
                let name = file_name(path, "stdout.log");
                form = form.part(
                    "log",
                    reqwest::multipart::Part::bytes(bytes)
                        .file_name(name)
                        .mime_str("text/plain")?,
                );
            }
        }

        let response = self
            .client
            .post(self.url(&format!("/api/v1/compilation/{}", upload.code)))
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn register_host(&self, info: &HostInfo) -> Result<(), BackendError> {
        let response = self
            .client
            .post(self.url("/api/v1/compilers"))
            .bearer_auth(&self.token)
            .json(info)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn register_service(&self, ip: &str, service_id: &str) -> Result<(), BackendError> {
        let response = self
            .client
            .post(self.url(&format!("/api/v1/compilers/{}", ip)))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "service": service_id }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn heartbeat(&self, ip: &str, service_id: &str) -> Result<(), BackendError> {
        let response = self
            .client
            .post(self.url(&format!(
                "/api/v1/compilers/{}/{}/heartbeat",
                ip, service_id
            )))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn deregister(&self, ip: &str, service_id: &str) -> Result<(), BackendError> {
        let response = self
            .client
            .delete(self.url(&format!("/api/v1/compilers/{}/{}", ip, service_id)))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

fn file_name(path: &std::path::Path, fallback: &str) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{Backend, BackendError, HostInfo, ResultUpload};
    use anvil_core::Platform;
    use parking_lot::Mutex;
    use serde_json::Value;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// What a [`FakeBackend`] saw for one `post_result` call.
    #[derive(Debug, Clone)]
    pub struct RecordedUpload {
        pub code: String,
        pub data: Value,
        pub had_artifact: bool,
        pub had_log: bool,
    }

    #[derive(Default)]
    struct FakeState {
        jobs: VecDeque<Value>,
        post_statuses: VecDeque<u16>,
        uploads: Vec<RecordedUpload>,
        fetches: u32,
        heartbeats: u32,
        registered: bool,
        deregistered: bool,
    }

    /// Scripted in-memory backend for service tests.
    #[derive(Clone, Default)]
    pub struct FakeBackend {
        state: Arc<Mutex<FakeState>>,
    }

    impl FakeBackend {
        pub fn new() -> FakeBackend {
            FakeBackend::default()
        }

        /// Queue a job payload to hand to the next `fetch_job`.
        pub fn push_job(&self, job: Value) {
            self.state.lock().jobs.push_back(job);
        }

        /// Script the HTTP status for upcoming `post_result` calls
        /// (defaults to 200 once the script runs out).
        pub fn push_post_status(&self, status: u16) {
            self.state.lock().post_statuses.push_back(status);
        }

        pub fn uploads(&self) -> Vec<RecordedUpload> {
            self.state.lock().uploads.clone()
        }

        pub fn fetch_count(&self) -> u32 {
            self.state.lock().fetches
        }

        pub fn heartbeat_count(&self) -> u32 {
            self.state.lock().heartbeats
        }

        pub fn is_registered(&self) -> bool {
            self.state.lock().registered
        }

        pub fn is_deregistered(&self) -> bool {
            self.state.lock().deregistered
        }
    }

    #[async_trait::async_trait]
    impl Backend for FakeBackend {
        async fn fetch_job(&self, _platforms: &[Platform]) -> Result<Option<Value>, BackendError> {
            let mut state = self.state.lock();
            state.fetches += 1;
            Ok(state.jobs.pop_front())
        }

        async fn post_result(&self, upload: &ResultUpload) -> Result<(), BackendError> {
            let mut state = self.state.lock();
            let status = state.post_statuses.pop_front().unwrap_or(200);
            if !(200..400).contains(&status) {
                return Err(BackendError::Status {
                    status,
                    body: "scripted failure".to_string(),
                });
            }
            state.uploads.push(RecordedUpload {
                code: upload.code.clone(),
                data: upload.data_json(),
                had_artifact: upload.artifact.as_deref().is_some_and(|p| p.is_file()),
                had_log: upload.log.as_deref().is_some_and(|p| p.is_file()),
            });
            Ok(())
        }

        async fn register_host(&self, _info: &HostInfo) -> Result<(), BackendError> {
            self.state.lock().registered = true;
            Ok(())
        }

        async fn register_service(&self, _ip: &str, _service_id: &str) -> Result<(), BackendError> {
            Ok(())
        }

        async fn heartbeat(&self, _ip: &str, _service_id: &str) -> Result<(), BackendError> {
            self.state.lock().heartbeats += 1;
            Ok(())
        }

        async fn deregister(&self, _ip: &str, _service_id: &str) -> Result<(), BackendError> {
            self.state.lock().deregistered = true;
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeBackend, RecordedUpload};

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
