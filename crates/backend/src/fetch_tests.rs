// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[tokio::test]
async fn copies_relative_paths_from_config_root() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("config.xml"), b"<widget/>").unwrap();

    let dest = dir.path().join("out/config.xml");
    fetch_to_file(
        &reqwest::Client::new(),
        "config.xml",
        Some(dir.path()),
        &dest,
    )
    .await
    .unwrap();

    assert_eq!(std::fs::read(dest).unwrap(), b"<widget/>");
}

#[tokio::test]
async fn strips_file_scheme() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src.zip");
    std::fs::write(&src, b"zipbytes").unwrap();

    let dest = dir.path().join("out/source.zip");
    fetch_to_file(
        &reqwest::Client::new(),
        &format!("file://{}", src.display()),
        None,
        &dest,
    )
    .await
    .unwrap();

    assert_eq!(std::fs::read(dest).unwrap(), b"zipbytes");
}

#[tokio::test]
async fn missing_relative_source_errors() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("dest");
    let err = fetch_to_file(
        &reqwest::Client::new(),
        "nope.xml",
        Some(dir.path()),
        &dest,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, BackendError::Io(_)));
}
