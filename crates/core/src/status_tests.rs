// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn parses_known_fields() {
    let status = AgentStatus::from_value(json!({
        "state": "success",
        "os": { "name": "iOS", "version": "14.5", "sdkVersion": "14.5" },
        "ios": { "simulatorVersion": "14.5", "ip": "192.168.1.20" },
        "build": {
            "time": "Jun 24 2018 17:08:21",
            "productBundleIdentifier": "com.facebook.WebDriverAgentRunner",
            "upgradedAt": "1600000000000"
        }
    }))
    .unwrap();

    assert_eq!(status.state.as_deref(), Some("success"));
    assert_eq!(status.os.as_ref().and_then(|o| o.sdk_version.as_deref()), Some("14.5"));
    assert_eq!(status.device_ip(), Some("192.168.1.20"));
    let build = status.build.unwrap();
    assert_eq!(
        build.product_bundle_identifier.as_deref(),
        Some("com.facebook.WebDriverAgentRunner")
    );
    assert_eq!(build.upgraded_at().as_deref(), Some("1600000000000"));
}

#[test]
fn keeps_unknown_fields() {
    let status = AgentStatus::from_value(json!({
        "ready": true,
        "build": { "time": "now", "commit": "abc" }
    }))
    .unwrap();

    assert_eq!(status.extra.get("ready"), Some(&json!(true)));
    assert_eq!(status.build.unwrap().extra.get("commit"), Some(&json!("abc")));
}

#[test]
fn malformed_section_moves_to_extra() {
    let status = AgentStatus::from_value(json!({ "build": "data" })).unwrap();
    assert!(status.build.is_none());
    assert_eq!(status.extra.get("build"), Some(&json!("data")));
    assert_eq!(status.to_value(), json!({ "build": "data" }));
}

#[test]
fn numeric_build_time_keeps_build_section() {
    let status = AgentStatus::from_value(json!({
        "build": { "time": 1700000000, "productBundleIdentifier": "com.facebook.WebDriverAgentRunner" }
    }))
    .unwrap();

    assert!(status.extra.get("build").is_none());
    let build = status.build.unwrap();
    assert_eq!(build.time, Some(json!(1700000000)));
    assert_eq!(
        build.product_bundle_identifier.as_deref(),
        Some("com.facebook.WebDriverAgentRunner")
    );
}

#[test]
fn non_object_is_rejected() {
    assert!(AgentStatus::from_value(json!(null)).is_none());
    assert!(AgentStatus::from_value(json!("ok")).is_none());
}

#[yare::parameterized(
    string  = { json!({ "upgradedAt": "1" }), Some("1") },
    number  = { json!({ "upgradedAt": 42 }), Some("42") },
    empty   = { json!({ "upgradedAt": "" }), None },
    null    = { json!({ "upgradedAt": null }), None },
    missing = { json!({}), None },
)]
fn upgraded_at(build: serde_json::Value, expected: Option<&str>) {
    let build: BuildInfo = serde_json::from_value(build).unwrap();
    assert_eq!(build.upgraded_at().as_deref(), expected);
}
