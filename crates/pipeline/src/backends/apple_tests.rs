// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn parses_uuid_from_decoded_profile() {
    let plist = r#"
    <key>TeamName</key>
    <string>Example</string>
    <key>UUID</key>
    <string>a1b2c3d4-e5f6-4a7b-8c9d-0e1f2a3b4c5d</string>
"#;
    assert_eq!(
        parse_profile_uuid(plist).as_deref(),
        Some("A1B2C3D4-E5F6-4A7B-8C9D-0E1F2A3B4C5D")
    );
}

#[test]
fn no_uuid_key_yields_none() {
    assert!(parse_profile_uuid("<key>Name</key><string>x</string>").is_none());
}

#[test]
fn identity_is_shared_between_development_and_distribution() {
    assert_eq!(MAC_SIGNING_IDENTITY, "Mac Developer");
    assert!(osx_export_options().contains(MAC_SIGNING_IDENTITY));
}

#[test]
fn ios_export_method_is_ad_hoc() {
    assert!(ios_export_options().contains("ad-hoc"));
}
