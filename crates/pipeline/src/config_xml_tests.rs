// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const FULL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<widget xmlns="http://www.w3.org/ns/widgets"
        xmlns:cocoon="http://cocoon.io/ns/1.0"
        id="com.example.game">
    <name>My Game</name>
    <engine name="android" spec="~9.0.0"/>
    <engine name="ios"/>
    <plugin name="cordova-plugin-camera" spec="^4.0.0">
        <variable name="CAMERA_USAGE" value="photos"/>
    </plugin>
    <cocoon:platform name="ubuntu" version="1.2.0"/>
    <cocoon:plugin name="cocoon-plugin-ads">
        <param name="APP_ID" value="ca-app-123"/>
        <param name="BANNER" value="top"/>
    </cocoon:plugin>
    <icon src="res/icon.png"/>
    <splash src="res/splash.png"/>
</widget>
"#;

#[test]
fn parses_name_and_id() {
    let config = parse(FULL).unwrap();
    assert_eq!(config.name, "My Game");
    assert_eq!(config.id.as_deref(), Some("com.example.game"));
}

#[test]
fn standard_engines_keep_their_spec() {
    let config = parse(FULL).unwrap();
    let android = config.engine_for("android").unwrap();
    assert_eq!(android.spec.as_deref(), Some("~9.0.0"));
    assert_eq!(android.install_spec(), "~9.0.0");
}

#[test]
fn engine_without_spec_installs_latest() {
    let config = parse(FULL).unwrap();
    let ios = config.engine_for("ios").unwrap();
    assert!(ios.spec.is_none());
    assert_eq!(ios.install_spec(), "latest");
}

#[test]
fn legacy_platform_elements_become_engines() {
    let config = parse(FULL).unwrap();
    let ubuntu = config.engine_for("ubuntu").unwrap();
    assert_eq!(ubuntu.spec.as_deref(), Some("1.2.0"));
}

#[test]
fn legacy_plugin_params_become_variables() {
    let config = parse(FULL).unwrap();
    let ads = config
        .plugins
        .iter()
        .find(|p| p.name == "cocoon-plugin-ads")
        .unwrap();
    assert_eq!(
        ads.variables,
        vec![
            ("APP_ID".to_string(), "ca-app-123".to_string()),
            ("BANNER".to_string(), "top".to_string()),
        ]
    );
    // No spec on the legacy plugin: installer gets `*`.
    assert_eq!(ads.install_spec(), "*");
}

#[test]
fn standard_plugin_variables_are_preserved() {
    let config = parse(FULL).unwrap();
    let camera = config
        .plugins
        .iter()
        .find(|p| p.name == "cordova-plugin-camera")
        .unwrap();
    assert_eq!(camera.install_spec(), "^4.0.0");
    assert_eq!(
        camera.variables,
        vec![("CAMERA_USAGE".to_string(), "photos".to_string())]
    );
}

#[test]
fn icons_and_splashes_are_collected() {
    let config = parse(FULL).unwrap();
    assert_eq!(config.icons, vec!["res/icon.png"]);
    assert_eq!(config.splashes, vec!["res/splash.png"]);
}

#[test]
fn missing_name_is_an_error() {
    let xml = r#"<widget xmlns="http://www.w3.org/ns/widgets"></widget>"#;
    assert!(matches!(parse(xml), Err(ConfigXmlError::MissingName)));
}

#[test]
fn malformed_xml_is_an_error() {
    assert!(matches!(
        parse("<widget><name>x</name>"),
        Err(ConfigXmlError::Malformed(_))
    ));
}
