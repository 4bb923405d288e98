// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn android_payload() -> serde_json::Value {
    json!({
        "code": "A1",
        "platforms": [{"name": "android"}],
        "config": "https://backend/config.xml",
        "source": "https://backend/src.zip",
        "libVersion": "8.0.0"
    })
}

#[test]
fn parses_minimal_android_job() {
    let job = Job::from_json(android_payload(), 1_700_000_000_000).unwrap();
    assert_eq!(job.code, "A1");
    assert_eq!(job.platform, Platform::Android);
    assert_eq!(job.lib_version, "8.0.0");
    assert_eq!(job.starttime, 1_700_000_000_000);
    assert!(!job.is_signed());
    assert_eq!(job.workspace_name(), "A1_1700000000000");
}

#[test]
fn raw_json_is_kept_verbatim() {
    let payload = android_payload();
    let job = Job::from_json(payload.clone(), 1).unwrap();
    assert_eq!(job.raw, payload);
}

#[test]
fn missing_required_fields_fail() {
    for field in ["code", "config", "source", "libVersion"] {
        let mut payload = android_payload();
        payload.as_object_mut().unwrap().remove(field);
        assert_eq!(
            Job::from_json(payload, 1),
            Err(JobError::MissingField(match field {
                "code" => "code",
                "config" => "config",
                "source" => "source",
                _ => "libVersion",
            }))
        );
    }
}

#[test]
fn empty_platform_list_fails() {
    let mut payload = android_payload();
    payload["platforms"] = json!([]);
    assert_eq!(Job::from_json(payload, 1), Err(JobError::EmptyPlatforms));
}

#[test]
fn first_platform_wins() {
    let mut payload = android_payload();
    payload["platforms"] = json!([{"name": "ubuntu"}, {"name": "android"}]);
    let job = Job::from_json(payload, 1).unwrap();
    assert_eq!(job.platform, Platform::Ubuntu);
}

#[test]
fn unknown_platform_is_rejected() {
    let mut payload = android_payload();
    payload["platforms"] = json!([{"name": "symbian"}]);
    assert_eq!(
        Job::from_json(payload, 1),
        Err(JobError::UnknownPlatform("symbian".into()))
    );
}

#[test]
fn android_signing_key_parses() {
    let mut payload = android_payload();
    payload["platforms"][0]["key"] = json!({
        "keystore": "https://backend/k.keystore",
        "alias": "release",
        "keystorepass": "s1",
        "aliaspass": "s2"
    });
    let job = Job::from_json(payload, 1).unwrap();
    assert!(job.is_signed());
    match job.key.unwrap() {
        SigningKey::Android { alias, .. } => assert_eq!(alias, "release"),
        other => panic!("expected android key, got {:?}", other),
    }
}

#[test]
fn apple_key_requires_provisioning() {
    let mut payload = android_payload();
    payload["platforms"] = json!([{
        "name": "ios",
        "key": {"p12": "https://backend/dev.p12", "password": "pw"}
    }]);
    let err = Job::from_json(payload, 1).unwrap_err();
    assert!(matches!(err, JobError::InvalidKey { platform: Platform::Ios, .. }));
}

#[test]
fn windows_key_thumbprint_is_optional() {
    let mut payload = android_payload();
    payload["platforms"] = json!([{
        "name": "windows",
        "key": {"pfx": "https://backend/app.pfx", "publisher": "CN=Example"}
    }]);
    let job = Job::from_json(payload, 1).unwrap();
    match job.key.unwrap() {
        SigningKey::Windows { thumbprint, .. } => assert!(thumbprint.is_none()),
        other => panic!("expected windows key, got {:?}", other),
    }
}

#[test]
fn null_key_means_unsigned() {
    let mut payload = android_payload();
    payload["platforms"][0]["key"] = json!(null);
    let job = Job::from_json(payload, 1).unwrap();
    assert!(!job.is_signed());
}

#[test]
fn builder_defaults_make_an_unsigned_android_job() {
    let job = Job::builder().build();
    assert_eq!(job.platform, Platform::Android);
    assert!(!job.is_signed());
    assert_eq!(job.workspace_name(), "A1_1700000000000");
}

#[test]
fn builder_overrides_apply() {
    let job = Job::builder()
        .code("W9")
        .platform(Platform::Windows)
        .starttime(5)
        .lib_version("9.0.0")
        .key(SigningKey::Windows {
            pfx: "https://backend/app.pfx".to_string(),
            thumbprint: None,
            publisher: "CN=Example".to_string(),
        })
        .build();
    assert_eq!(job.workspace_name(), "W9_5");
    assert_eq!(job.lib_version, "9.0.0");
    assert!(job.is_signed());
}

#[test]
fn icon_and_splash_urls_are_read() {
    let mut payload = android_payload();
    payload["platforms"][0]["icon"] = json!("https://backend/icon.png");
    payload["platforms"][0]["splash"] = json!("https://backend/splash.png");
    let job = Job::from_json(payload, 1).unwrap();
    assert_eq!(job.icon.as_deref(), Some("https://backend/icon.png"));
    assert_eq!(job.splash.as_deref(), Some("https://backend/splash.png"));
}
