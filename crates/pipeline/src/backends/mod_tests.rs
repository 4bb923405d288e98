// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use anvil_core::{Environment, FarmPaths, Job, JobWorkspace};
use serde_json::json;

pub(crate) fn test_ctx(
    root: &Path,
    platform: &str,
    key: Option<serde_json::Value>,
) -> BuildContext {
    let payload = json!({
        "code": "A1",
        "platforms": [{"name": platform, "key": key}],
        "config": "file:///tmp/config.xml",
        "source": "file:///tmp/src.zip",
        "libVersion": "8.0.0"
    });
    let job = Job::from_json(payload, 1_700_000_000_000).unwrap();

    let farm = FarmPaths::new(root, Environment::Testing);
    let ws = JobWorkspace::new(&farm, &job.code, job.starttime);
    ws.create().unwrap();

    BuildContext {
        env: Environment::Testing,
        job,
        ws,
        data_dir: farm.data_dir(),
        config_root: None,
        client: reqwest::Client::new(),
    }
}

#[test]
fn collect_matching_filters_by_pattern() {
    let dir = tempfile::tempdir().unwrap();
    let apk_dir = dir.path().join("app/build/outputs/apk/debug");
    std::fs::create_dir_all(&apk_dir).unwrap();
    std::fs::write(apk_dir.join("app-debug.apk"), b"apk").unwrap();
    std::fs::write(apk_dir.join("output-metadata.json"), b"{}").unwrap();

    let pattern = Regex::new(r"(?i)/outputs/apk/.*\.apk$").unwrap();
    let found = collect_matching(dir.path(), &pattern);
    assert_eq!(found.len(), 1);
    assert!(found[0].ends_with("app-debug.apk"));
}

#[test]
fn collect_matching_is_sorted() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("b.deb"), b"b").unwrap();
    std::fs::write(dir.path().join("a.deb"), b"a").unwrap();

    let pattern = Regex::new(r"\.deb$").unwrap();
    let found = collect_matching(dir.path(), &pattern);
    assert!(found[0].ends_with("a.deb"));
    assert!(found[1].ends_with("b.deb"));
}

#[tokio::test]
async fn pack_artifacts_rejects_an_empty_set() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(dir.path(), "android", None);

    let err = pack_artifacts(&ctx, vec![]).await.unwrap_err();
    assert_eq!(
        err.msg_public,
        "The build finished but produced no installable artifacts."
    );
}

#[tokio::test]
async fn pack_artifacts_writes_one_zip_named_after_the_job() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(dir.path(), "android", None);

    let apk = ctx.ws.dir().join("app-release-unsigned.apk");
    std::fs::write(&apk, b"apk").unwrap();
    pack_artifacts(&ctx, vec![apk]).await.unwrap();

    let artifact = ctx.ws.first_artifact().unwrap();
    let name = artifact.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("A1_android_"));
    assert!(name.ends_with(".zip"));
}

#[test]
fn every_platform_has_a_backend() {
    for platform in anvil_core::Platform::all() {
        let _ = for_platform(platform);
    }
}
