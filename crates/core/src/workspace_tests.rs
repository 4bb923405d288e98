// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

fn farm(root: &Path) -> FarmPaths {
    FarmPaths::new(root, Environment::Testing)
}

#[test]
fn farm_layout_is_fixed() {
    let farm = farm(Path::new("/state"));
    assert_eq!(farm.root(), Path::new("/state/workspace/testing"));
    assert_eq!(farm.data_dir(), Path::new("/state/workspace/testing/data"));
    assert_eq!(
        farm.ready_lock(),
        Path::new("/state/workspace/testing/data/ready.lock")
    );
    assert_eq!(
        farm.manifest_path(),
        Path::new("/state/workspace/testing/s3_structure.json")
    );
    assert_eq!(
        farm.service_lock("builder"),
        Path::new("/state/workspace/testing/builder.lock")
    );
}

#[test]
fn job_workspace_is_named_by_code_and_starttime() {
    let dir = tempdir().unwrap();
    let farm = farm(dir.path());
    let ws = JobWorkspace::new(&farm, "A1", 1_700_000_000_000);
    assert!(ws.dir().ends_with("projects/A1_1700000000000"));

    // Distinct start times give distinct workspaces for the same code.
    let other = JobWorkspace::new(&farm, "A1", 1_700_000_000_001);
    assert_ne!(ws.dir(), other.dir());
}

#[test]
fn create_builds_the_full_tree() {
    let dir = tempdir().unwrap();
    let farm = farm(dir.path());
    let ws = JobWorkspace::new(&farm, "A1", 1);
    ws.create().unwrap();

    for sub in [
        ws.project_dir(),
        ws.tmp_dir(),
        ws.certs_dir(),
        ws.icons_dir(),
        ws.splashes_dir(),
        ws.out_dir(),
    ] {
        assert!(sub.is_dir(), "missing {}", sub.display());
    }
}

#[test]
fn config_json_is_written_atomically() {
    let dir = tempdir().unwrap();
    let farm = farm(dir.path());
    let ws = JobWorkspace::new(&farm, "A1", 1);
    ws.create().unwrap();

    let payload = serde_json::json!({"code": "A1", "libVersion": "8.0.0"});
    ws.write_config_json(&payload).unwrap();

    let read: serde_json::Value =
        serde_json::from_slice(&std::fs::read(ws.config_json()).unwrap()).unwrap();
    assert_eq!(read, payload);
    // No temp file left behind.
    assert!(!ws.dir().join("config.json.tmp").exists());
}

#[test]
fn first_artifact_returns_sorted_first_file() {
    let dir = tempdir().unwrap();
    let farm = farm(dir.path());
    let ws = JobWorkspace::new(&farm, "A1", 1);
    ws.create().unwrap();

    assert!(ws.first_artifact().is_none());
    std::fs::write(ws.out_dir().join("b.zip"), b"b").unwrap();
    std::fs::write(ws.out_dir().join("a.zip"), b"a").unwrap();
    let first = ws.first_artifact().unwrap();
    assert!(first.ends_with("a.zip"));
}

#[test]
fn remove_deletes_the_tree_and_is_idempotent() {
    let dir = tempdir().unwrap();
    let farm = farm(dir.path());
    let ws = JobWorkspace::new(&farm, "A1", 1);
    ws.create().unwrap();

    ws.remove().unwrap();
    assert!(!ws.exists());
    ws.remove().unwrap();
}
