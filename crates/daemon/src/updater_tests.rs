// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use anvil_core::Environment;
use object_store::memory::InMemory;
use object_store::PutPayload;
use tempfile::tempdir;

/// Writes a marker instead of running tar.
struct FakeExtractor;

#[async_trait]
impl ArchiveExtractor for FakeExtractor {
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<(), String> {
        let name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        std::fs::write(dest.join("unpacked.txt"), name).map_err(|e| e.to_string())
    }
}

struct FailingExtractor;

#[async_trait]
impl ArchiveExtractor for FailingExtractor {
    async fn extract(&self, _archive: &Path, _dest: &Path) -> Result<(), String> {
        Err("bzip2 stream truncated".to_string())
    }
}

async fn put(store: &InMemory, key: &str) {
    store
        .put(
            &object_store::path::Path::from(key),
            PutPayload::from_static(b"archive-bytes"),
        )
        .await
        .unwrap();
}

fn updater(root: &Path, store: Arc<InMemory>) -> (UpdaterService, FarmPaths) {
    let farm = FarmPaths::new(root, Environment::Testing);
    farm.ensure_base().unwrap();
    let svc = UpdaterService::new(farm.clone(), store)
        .with_host_os(HostOs::Linux)
        .with_extractor(Arc::new(FakeExtractor));
    (svc, farm)
}

#[tokio::test]
async fn first_sync_populates_cache_and_touches_ready() {
    let dir = tempdir().unwrap();
    let store = Arc::new(InMemory::new());
    put(&store, "plugins/camera.tar.bz2").await;
    put(&store, "platforms/android.tar.bz2").await;
    let (svc, farm) = updater(dir.path(), store);

    let report = svc.sync().await.unwrap();
    assert_eq!(report.downloaded.len(), 2);
    assert_eq!(report.tracked, 2);

    assert!(farm.data_dir().join("plugins/camera/unpacked.txt").exists());
    assert!(farm
        .data_dir()
        .join("platforms/android/unpacked.txt")
        .exists());
    assert!(farm.ready_lock().exists());
    assert!(farm.manifest_path().exists());
    // Scratch dir is gone after the iteration.
    assert!(!farm.sync_dir().exists());
}

#[tokio::test]
async fn unchanged_remote_state_is_a_no_op() {
    let dir = tempdir().unwrap();
    let store = Arc::new(InMemory::new());
    put(&store, "plugins/camera.tar.bz2").await;
    let (svc, farm) = updater(dir.path(), store);

    svc.sync().await.unwrap();
    let first_mirror = std::fs::read(farm.manifest_path()).unwrap();

    let report = svc.sync().await.unwrap();
    assert!(report.downloaded.is_empty());
    assert!(report.purged.is_empty());
    // Mirror re-persists byte-equal.
    assert_eq!(std::fs::read(farm.manifest_path()).unwrap(), first_mirror);
}

#[tokio::test]
async fn remote_add_and_remove_reconcile() {
    let dir = tempdir().unwrap();
    let store = Arc::new(InMemory::new());
    put(&store, "plugins/old.tar.bz2").await;
    let (svc, farm) = updater(dir.path(), store.clone());

    svc.sync().await.unwrap();
    assert!(farm.data_dir().join("plugins/old").exists());

    store
        .delete(&object_store::path::Path::from("plugins/old.tar.bz2"))
        .await
        .unwrap();
    put(&store, "plugins/new.tar.bz2").await;

    let report = svc.sync().await.unwrap();
    assert_eq!(report.downloaded, vec!["plugins/new.tar.bz2"]);
    assert_eq!(report.purged, vec!["plugins/old.tar.bz2"]);
    assert!(farm.data_dir().join("plugins/new/unpacked.txt").exists());
    assert!(!farm.data_dir().join("plugins/old").exists());
}

#[tokio::test]
async fn missing_output_dir_forces_redownload() {
    let dir = tempdir().unwrap();
    let store = Arc::new(InMemory::new());
    put(&store, "plugins/camera.tar.bz2").await;
    let (svc, farm) = updater(dir.path(), store);

    svc.sync().await.unwrap();
    std::fs::remove_dir_all(farm.data_dir().join("plugins/camera")).unwrap();

    // LastModified is unchanged, but the subtree is gone: redo.
    let report = svc.sync().await.unwrap();
    assert_eq!(report.downloaded, vec!["plugins/camera.tar.bz2"]);
    assert!(farm.data_dir().join("plugins/camera/unpacked.txt").exists());
}

#[tokio::test]
async fn foreign_os_libs_are_skipped() {
    let dir = tempdir().unwrap();
    let store = Arc::new(InMemory::new());
    put(&store, "libs/8.0.0-linux.tar.bz2").await;
    put(&store, "libs/8.0.0-darwin.tar.bz2").await;
    put(&store, "sdks/android-sdk-win32.tar.bz2").await;
    let (svc, farm) = updater(dir.path(), store);

    let report = svc.sync().await.unwrap();
    assert_eq!(report.downloaded, vec!["libs/8.0.0-linux.tar.bz2"]);
    assert!(farm.data_dir().join("libs/8.0.0").exists());
    assert!(!farm.data_dir().join("sdks").join("android-sdk-win32").exists());
}

#[tokio::test]
async fn empty_listing_never_touches_ready() {
    let dir = tempdir().unwrap();
    let store = Arc::new(InMemory::new());
    let (svc, farm) = updater(dir.path(), store);

    svc.sync().await.unwrap();
    assert!(!farm.ready_lock().exists());
}

#[tokio::test]
async fn extraction_failure_aborts_the_iteration() {
    let dir = tempdir().unwrap();
    let store = Arc::new(InMemory::new());
    put(&store, "plugins/camera.tar.bz2").await;

    let farm = FarmPaths::new(dir.path(), Environment::Testing);
    farm.ensure_base().unwrap();
    let svc = UpdaterService::new(farm.clone(), store)
        .with_host_os(HostOs::Linux)
        .with_extractor(Arc::new(FailingExtractor));

    let err = svc.sync().await.unwrap_err();
    assert!(matches!(err, ServiceError::Sync(_)));
    // Aborted before the mirror persisted or the gate opened; the next
    // iteration redoes everything.
    assert!(!farm.manifest_path().exists());
    assert!(!farm.ready_lock().exists());
}

#[tokio::test]
async fn untracked_keys_are_silently_ignored() {
    let dir = tempdir().unwrap();
    let store = Arc::new(InMemory::new());
    put(&store, "random/readme.txt").await;
    put(&store, "plugins/camera.tar.bz2").await;
    let (svc, _farm) = updater(dir.path(), store);

    let report = svc.sync().await.unwrap();
    assert_eq!(report.tracked, 1);
    assert_eq!(report.downloaded, vec!["plugins/camera.tar.bz2"]);
}
