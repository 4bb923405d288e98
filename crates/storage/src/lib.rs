// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! anvil-storage: durable on-host state.
//!
//! Everything the services share lives on disk: the notification queue,
//! the working/readiness lock files, and the mirrored bucket manifest.
//! All writes here are atomic renames so any service can crash at any
//! point without corrupting a peer's view.

mod locks;
mod manifest_store;
mod queue;

pub use locks::{ReadyMarker, ServiceMeta, WorkingLock};
pub use manifest_store::ManifestStore;
pub use queue::{DurableQueue, Leased, QueueError, DEFAULT_VISIBILITY};

use std::io;
use std::path::Path;

/// Write `bytes` to a sibling temp file and rename it into place.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}
