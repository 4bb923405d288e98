// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! anvil-backend: the worker's HTTP surface to the central backend.
//!
//! Job fetch, result upload, and the registration/heartbeat protocol are
//! behind the [`Backend`] trait so services can run against a fake in
//! tests. All requests carry the fixed bearer credential and a 10 s
//! timeout; registration traffic is best-effort by contract.

mod client;
mod fetch;
mod ip;

pub use client::{Backend, BackendError, HostInfo, HttpBackend, ResultUpload, HTTP_TIMEOUT};
#[cfg(any(test, feature = "test-support"))]
pub use client::{FakeBackend, RecordedUpload};
pub use fetch::fetch_to_file;
pub use ip::external_ip;
