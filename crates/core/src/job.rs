// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A build job as fetched from the backend queue.
//!
//! The backend sends jobs as JSON; [`Job::from_json`] validates the required
//! fields and binds the acquisition timestamp. The raw JSON is kept verbatim
//! because it is persisted unmodified as the workspace `config.json` and
//! handed to the build child.

use crate::platform::Platform;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors from job JSON validation.
#[derive(Debug, Error, PartialEq)]
pub enum JobError {
    #[error("job is missing required field '{0}'")]
    MissingField(&'static str),
    #[error("job lists no platforms")]
    EmptyPlatforms,
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),
    #[error("malformed signing key for {platform}: {reason}")]
    InvalidKey { platform: Platform, reason: String },
    #[error("job payload is not a JSON object")]
    NotAnObject,
}

/// Platform-specific signing material, referenced by URL.
///
/// The shape follows the target toolchain: keystore/alias/passwords for
/// Android, p12 + provisioning profile for Apple, PFX + publisher for
/// Windows. Ubuntu builds are never signed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SigningKey {
    Android {
        keystore: String,
        alias: String,
        keystorepass: String,
        aliaspass: String,
    },
    Apple {
        p12: String,
        provisioning: String,
        password: String,
    },
    Windows {
        pfx: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thumbprint: Option<String>,
        publisher: String,
    },
}

/// One compilation request.
///
/// `(code, starttime)` uniquely names the job's workspace directory for
/// its whole lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// Opaque job identifier, used in every path and backend call.
    pub code: String,
    /// Acquisition timestamp, epoch milliseconds.
    pub starttime: u64,
    pub platform: Platform,
    pub key: Option<SigningKey>,
    /// Optional icon / splash asset URLs.
    pub icon: Option<String>,
    pub splash: Option<String>,
    /// URL of the project manifest (config.xml).
    pub config: String,
    /// URL of the project sources (zip).
    pub source: String,
    /// Version of the native build library to drive.
    pub lib_version: String,
    /// The job JSON exactly as received; persisted as `config.json`.
    pub raw: Value,
}

impl Job {
    /// Validate a backend job payload and bind the acquisition timestamp.
    ///
    /// Required fields: `code`, `platforms[]` (non-empty; the first entry
    /// is this job's platform), `config`, `source`, `libVersion`.
    pub fn from_json(raw: Value, starttime: u64) -> Result<Job, JobError> {
        let obj = raw.as_object().ok_or(JobError::NotAnObject)?;

        let code = required_str(obj, "code")?;
        let config = required_str(obj, "config")?;
        let source = required_str(obj, "source")?;
        let lib_version = required_str(obj, "libVersion")?;

        let platforms = obj
            .get("platforms")
            .and_then(Value::as_array)
            .ok_or(JobError::MissingField("platforms"))?;
        let first = platforms.first().ok_or(JobError::EmptyPlatforms)?;

        let name = first
            .get("name")
            .and_then(Value::as_str)
            .ok_or(JobError::MissingField("platforms[0].name"))?;
        let platform: Platform = name
            .parse()
            .map_err(|_| JobError::UnknownPlatform(name.to_string()))?;

        let key = match first.get("key") {
            None | Some(Value::Null) => None,
            Some(v) => Some(parse_key(platform, v)?),
        };

        let icon = first
            .get("icon")
            .and_then(Value::as_str)
            .map(str::to_string);
        let splash = first
            .get("splash")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Job {
            code,
            starttime,
            platform,
            key,
            icon,
            splash,
            config,
            source,
            lib_version,
            raw,
        })
    }

    /// Workspace directory name: `{code}_{starttime}`.
    pub fn workspace_name(&self) -> String {
        format!("{}_{}", self.code, self.starttime)
    }

    /// Whether this job carries signing material.
    ///
    /// Unsigned Android jobs build both debug and release-unsigned
    /// artifacts; signed jobs build release only.
    pub fn is_signed(&self) -> bool {
        self.key.is_some()
    }
}

fn required_str(
    obj: &serde_json::Map<String, Value>,
    field: &'static str,
) -> Result<String, JobError> {
    obj.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(JobError::MissingField(field))
}

fn parse_key(platform: Platform, v: &Value) -> Result<SigningKey, JobError> {
    let fail = |reason: &str| JobError::InvalidKey {
        platform,
        reason: reason.to_string(),
    };
    let field = |name: &str| -> Result<String, JobError> {
        v.get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| fail(&format!("missing '{}'", name)))
    };

    match platform {
        Platform::Android => Ok(SigningKey::Android {
            keystore: field("keystore")?,
            alias: field("alias")?,
            keystorepass: field("keystorepass")?,
            aliaspass: field("aliaspass")?,
        }),
        Platform::Ios | Platform::Osx => Ok(SigningKey::Apple {
            p12: field("p12")?,
            provisioning: field("provisioning")?,
            password: field("password")?,
        }),
        Platform::Windows => Ok(SigningKey::Windows {
            pfx: field("pfx")?,
            thumbprint: v
                .get("thumbprint")
                .and_then(Value::as_str)
                .map(str::to_string),
            publisher: field("publisher")?,
        }),
        Platform::Ubuntu => Err(fail("ubuntu jobs are never signed")),
    }
}

/// Test builder. Defaults describe an unsigned Android job.
#[cfg(any(test, feature = "test-support"))]
pub struct JobBuilder {
    code: String,
    starttime: u64,
    platform: Platform,
    key: Option<SigningKey>,
    lib_version: String,
}

#[cfg(any(test, feature = "test-support"))]
impl Default for JobBuilder {
    fn default() -> JobBuilder {
        JobBuilder {
            code: "A1".to_string(),
            starttime: 1_700_000_000_000,
            platform: Platform::Android,
            key: None,
            lib_version: "8.0.0".to_string(),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl JobBuilder {
    pub fn code(mut self, v: impl Into<String>) -> Self {
        self.code = v.into();
        self
    }

    pub fn starttime(mut self, v: u64) -> Self {
        self.starttime = v;
        self
    }

    pub fn platform(mut self, v: Platform) -> Self {
        self.platform = v;
        self
    }

    pub fn key(mut self, v: SigningKey) -> Self {
        self.key = Some(v);
        self
    }

    pub fn lib_version(mut self, v: impl Into<String>) -> Self {
        self.lib_version = v.into();
        self
    }

    pub fn build(self) -> Job {
        Job {
            code: self.code,
            starttime: self.starttime,
            platform: self.platform,
            key: self.key,
            icon: None,
            splash: None,
            config: "file:///tmp/config.xml".to_string(),
            source: "file:///tmp/src.zip".to_string(),
            lib_version: self.lib_version,
            raw: serde_json::json!({}),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Job {
    /// Create a builder with test defaults.
    pub fn builder() -> JobBuilder {
        JobBuilder::default()
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
