// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;

fn entry(key: &str, last_modified: &str) -> ManifestEntry {
    ManifestEntry {
        key: key.to_string(),
        last_modified: last_modified.to_string(),
        etag: "\"abc\"".to_string(),
        size: 1024,
    }
}

#[test]
fn derives_platform_target() {
    let t = CacheTarget::derive("platforms/android.tar.bz2").unwrap();
    assert_eq!(t.folder, CacheFolder::Platforms);
    assert_eq!(t.name, "android");
    assert_eq!(
        t.output_dir(std::path::Path::new("/w/data")),
        std::path::PathBuf::from("/w/data/platforms/android")
    );
}

#[test]
fn derives_compiler_version() {
    let t = CacheTarget::derive("compilers/compiler_cordova_9.0.0.tar.bz2").unwrap();
    assert_eq!(t.folder, CacheFolder::Compilers);
    assert_eq!(t.name, "9.0.0");
}

#[test]
fn compiler_without_prefix_is_ignored() {
    assert!(CacheTarget::derive("compilers/gradle_7.tar.bz2").is_none());
}

#[test]
fn derives_lib_version_stripping_os() {
    let t = CacheTarget::derive("libs/8.0.0-linux.tar.bz2").unwrap();
    assert_eq!(t.folder, CacheFolder::Libs);
    assert_eq!(t.name, "8.0.0");
}

#[test]
fn derives_sdk_with_full_stem() {
    let t = CacheTarget::derive("sdks/android-sdk-linux.tar.bz2").unwrap();
    assert_eq!(t.folder, CacheFolder::Sdks);
    assert_eq!(t.name, "android-sdk-linux");
}

#[test]
fn untracked_folders_are_ignored() {
    assert!(CacheTarget::derive("builds/thing.tar.bz2").is_none());
    assert!(CacheTarget::derive("readme.txt").is_none());
    assert!(CacheTarget::derive("platforms/nested/android.tar.bz2").is_none());
    assert!(CacheTarget::derive("platforms/android.zip").is_none());
}

#[test]
fn libs_and_sdks_filter_by_host_os() {
    assert!(is_relevant("libs/8.0.0-linux.tar.bz2", HostOs::Linux));
    assert!(!is_relevant("libs/8.0.0-darwin.tar.bz2", HostOs::Linux));
    assert!(is_relevant("sdks/android-sdk-darwin.tar.bz2", HostOs::Darwin));
    assert!(!is_relevant("sdks/android-sdk-win32.tar.bz2", HostOs::Darwin));
}

#[test]
fn other_folders_are_always_relevant() {
    assert!(is_relevant("platforms/android.tar.bz2", HostOs::Linux));
    assert!(is_relevant("plugins/camera.tar.bz2", HostOs::Win32));
    assert!(is_relevant("compilers/compiler_cordova_9.0.0.tar.bz2", HostOs::Darwin));
}

#[test]
fn normalizes_equivalent_timestamps() {
    assert_eq!(
        normalize_last_modified("2024-05-01T10:00:00.000Z"),
        normalize_last_modified("2024-05-01T12:00:00+02:00"),
    );
    // Unparseable values compare verbatim.
    assert_eq!(normalize_last_modified(" garbage "), "garbage");
}

#[test]
fn sync_status_downloads_without_prior_manifest() {
    let remote = entry("plugins/x.tar.bz2", "2024-05-01T10:00:00Z");
    assert_eq!(sync_status(&remote, None, true), SyncStatus::Download);
}

#[test]
fn sync_status_downloads_when_output_missing() {
    // LastModified matches, but the extracted directory is gone: redo.
    let remote = entry("plugins/x.tar.bz2", "2024-05-01T10:00:00Z");
    let prior = entry("plugins/x.tar.bz2", "2024-05-01T10:00:00Z");
    assert_eq!(
        sync_status(&remote, Some(&prior), false),
        SyncStatus::Download
    );
}

#[test]
fn sync_status_downloads_on_modified_change() {
    let remote = entry("plugins/x.tar.bz2", "2024-06-01T10:00:00Z");
    let prior = entry("plugins/x.tar.bz2", "2024-05-01T10:00:00Z");
    assert_eq!(
        sync_status(&remote, Some(&prior), true),
        SyncStatus::Download
    );
}

#[test]
fn sync_status_ignores_unchanged_entry() {
    let remote = entry("plugins/x.tar.bz2", "2024-05-01T10:00:00+00:00");
    let prior = entry("plugins/x.tar.bz2", "2024-05-01T10:00:00Z");
    assert_eq!(sync_status(&remote, Some(&prior), true), SyncStatus::Ignore);
}

#[test]
fn manifest_serde_uses_listing_field_names() {
    let json = serde_json::to_value(entry("plugins/x.tar.bz2", "2024-05-01T10:00:00Z")).unwrap();
    assert!(json.get("Key").is_some());
    assert!(json.get("LastModified").is_some());
    assert!(json.get("ETag").is_some());
    assert!(json.get("Size").is_some());
}

proptest! {
    #[test]
    fn plugin_names_round_trip(name in "[a-z][a-z0-9_.-]{0,30}") {
        let key = format!("plugins/{}.tar.bz2", name);
        let target = CacheTarget::derive(&key).unwrap();
        prop_assert_eq!(target.folder, CacheFolder::Plugins);
        prop_assert_eq!(target.name, name);
    }

    #[test]
    fn lib_keys_strip_exactly_the_os_tag(
        version in "[0-9]{1,2}\\.[0-9]{1,2}\\.[0-9]{1,2}",
        os in prop::sample::select(vec!["darwin", "linux", "win32"]),
    ) {
        let key = format!("libs/{}-{}.tar.bz2", version, os);
        let target = CacheTarget::derive(&key).unwrap();
        prop_assert_eq!(target.folder, CacheFolder::Libs);
        prop_assert_eq!(target.name, version);
    }

    #[test]
    fn derive_never_panics(key in "\\PC{0,60}") {
        let _ = CacheTarget::derive(&key);
    }
}
