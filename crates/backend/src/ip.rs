// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External IP lookup, best-effort.
//!
//! The registration protocol keys services by the host's externally
//! visible address. Lookup failure is not fatal; callers fall back to
//! the loopback address and registration proceeds (it is best-effort by
//! contract anyway).

const RESOLVER_URL: &str = "https://api.ipify.org";

/// Resolve the host's external IPv4 address.
pub async fn external_ip(client: &reqwest::Client) -> Option<String> {
    let resolver =
        std::env::var("ANVIL_IP_RESOLVER").unwrap_or_else(|_| RESOLVER_URL.to_string());
    match client.get(&resolver).send().await {
        Ok(response) if response.status().is_success() => {
            let text = response.text().await.ok()?;
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Ok(response) => {
            tracing::warn!(status = %response.status(), "ip resolver returned an error");
            None
        }
        Err(err) => {
            tracing::warn!(error = %err, "external ip lookup failed");
            None
        }
    }
}
