// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write as _;
use tempfile::tempdir;
use zip::write::SimpleFileOptions;

fn make_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let file = std::fs::File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    for (name, bytes) in entries {
        if name.ends_with('/') {
            writer.add_directory(name.trim_end_matches('/'), SimpleFileOptions::default()).unwrap();
        } else {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(bytes).unwrap();
        }
    }
    writer.finish().unwrap();
}

#[tokio::test]
async fn extract_zip_recreates_the_tree() {
    let dir = tempdir().unwrap();
    let zip_path = dir.path().join("src.zip");
    make_zip(
        &zip_path,
        &[
            ("app/", b""),
            ("app/index.html", b"<html/>"),
            ("app/js/main.js", b"x();"),
        ],
    );

    let dest = dir.path().join("tmp");
    extract_zip(&zip_path, &dest).await.unwrap();

    assert_eq!(
        std::fs::read(dest.join("app/index.html")).unwrap(),
        b"<html/>"
    );
    assert_eq!(std::fs::read(dest.join("app/js/main.js")).unwrap(), b"x();");
}

#[tokio::test]
async fn extract_zip_rejects_garbage() {
    let dir = tempdir().unwrap();
    let zip_path = dir.path().join("src.zip");
    std::fs::write(&zip_path, b"this is not a zip").unwrap();

    let err = extract_zip(&zip_path, &dir.path().join("tmp"))
        .await
        .unwrap_err();
    assert_eq!(err.msg_public, "The source package is not a valid zip file.");
}

#[test]
fn find_web_root_picks_the_shallowest_index() {
    let dir = tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("bundle/www/deep")).unwrap();
    std::fs::write(dir.path().join("bundle/www/index.html"), b"top").unwrap();
    std::fs::write(dir.path().join("bundle/www/deep/index.html"), b"deep").unwrap();

    let root = find_web_root(dir.path()).unwrap();
    assert!(root.ends_with("bundle/www"));
}

#[test]
fn find_web_root_matches_index_html_variants() {
    let dir = tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("app")).unwrap();
    std::fs::write(dir.path().join("app/index.html.orig"), b"x").unwrap();

    assert!(find_web_root(dir.path()).unwrap().ends_with("app"));
}

#[test]
fn find_web_root_none_without_index() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("main.js"), b"x").unwrap();
    assert!(find_web_root(dir.path()).is_none());
}

#[test]
fn copy_tree_preserves_structure() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    std::fs::create_dir_all(src.join("nested")).unwrap();
    std::fs::write(src.join("a.txt"), b"a").unwrap();
    std::fs::write(src.join("nested/b.txt"), b"b").unwrap();

    let dst = dir.path().join("dst");
    copy_tree(&src, &dst).unwrap();

    assert_eq!(std::fs::read(dst.join("a.txt")).unwrap(), b"a");
    assert_eq!(std::fs::read(dst.join("nested/b.txt")).unwrap(), b"b");
}

#[tokio::test]
async fn zip_files_then_extract_round_trips() {
    let dir = tempdir().unwrap();
    let debug = dir.path().join("app-debug.apk");
    let release = dir.path().join("app-release-unsigned.apk");
    std::fs::write(&debug, b"debug-bytes").unwrap();
    std::fs::write(&release, b"release-bytes").unwrap();

    let out = dir.path().join("A1_android_1.zip");
    zip_files(vec![debug, release], out.clone()).await.unwrap();

    let unpacked = dir.path().join("unpacked");
    extract_zip(&out, &unpacked).await.unwrap();
    assert_eq!(
        std::fs::read(unpacked.join("app-debug.apk")).unwrap(),
        b"debug-bytes"
    );
    assert_eq!(
        std::fs::read(unpacked.join("app-release-unsigned.apk")).unwrap(),
        b"release-bytes"
    );
}
