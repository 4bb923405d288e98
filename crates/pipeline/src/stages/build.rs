// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! build: emit the signing descriptor, then run the platform build.

use crate::backends::PlatformBackend;
use crate::error::StageError;
use crate::BuildContext;

pub async fn run(ctx: &BuildContext, backend: &dyn PlatformBackend) -> Result<(), StageError> {
    if let Err(err) = backend.build_json(ctx).await {
        // Unsigned builds do not consume the descriptor, so the build
        // proceeds; signed builds cannot continue without it.
        if ctx.job.is_signed() {
            return Err(err);
        }
        tracing::warn!(error = %err, "signing descriptor emission failed, continuing unsigned build");
    }

    backend.build(ctx).await
}
