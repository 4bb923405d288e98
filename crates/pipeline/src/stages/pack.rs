// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! pack: collect produced artifacts into the single output zip.

use crate::backends::PlatformBackend;
use crate::error::StageError;
use crate::BuildContext;

pub async fn run(ctx: &BuildContext, backend: &dyn PlatformBackend) -> Result<(), StageError> {
    backend.pack(ctx).await
}
