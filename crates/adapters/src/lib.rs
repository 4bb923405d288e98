// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! anvil-adapters: host-facing helpers shared by the services and the
//! build child (subprocess supervision, output redaction, /proc stats).

pub mod procinfo;
pub mod redact;
pub mod subprocess;

pub use procinfo::ProcSample;
pub use redact::redact_paths;
pub use subprocess::{run_logged, run_with_timeout, SubprocessError};
