// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fetch a job asset (config.xml, source.zip, icons) into a local file.
//!
//! Absolute http(s) URLs are downloaded; anything else is treated as a
//! path relative to the one-shot config root (or the current directory).

use crate::client::BackendError;
use futures_util::StreamExt;
use std::path::Path;
use tokio::io::AsyncWriteExt;

pub async fn fetch_to_file(
    client: &reqwest::Client,
    url_or_path: &str,
    config_root: Option<&Path>,
    dest: &Path,
) -> Result<(), BackendError> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    if url_or_path.starts_with("http://") || url_or_path.starts_with("https://") {
        let response = client.get(url_or_path).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: format!("fetching {}", url_or_path),
            });
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        return Ok(());
    }

    // file:// URLs and bare paths resolve against the config root.
    let raw = url_or_path.strip_prefix("file://").unwrap_or(url_or_path);
    let src = if Path::new(raw).is_absolute() {
        Path::new(raw).to_path_buf()
    } else {
        config_root
            .unwrap_or_else(|| Path::new("."))
            .join(raw)
    };
    tokio::fs::copy(&src, dest).await?;
    Ok(())
}

#[cfg(test)]
#[path = "fetch_tests.rs"]
mod tests;
