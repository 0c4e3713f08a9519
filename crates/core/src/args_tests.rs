// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use serial_test::serial;

#[test]
fn camel_case_capability_names() {
    let args = AgentArgs::from_json(json!({
        "wdaLocalPort": 9100,
        "wdaBaseUrl": "http://mockurl",
        "webDriverAgentUrl": "https://127.0.0.1:8100/",
        "updatedWDABundleId": "io.example.runner",
        "usePrebuiltWDA": true,
        "prebuildWDA": true,
        "iosSdkVersion": "14.5",
        "useXctestrunFile": true,
        "realDevice": true,
        "showXcodeLog": false,
    }))
    .unwrap();

    assert_eq!(args.wda_local_port, Some(9100));
    assert_eq!(args.wda_base_url.as_deref(), Some("http://mockurl"));
    assert!(args.has_agent_url());
    assert_eq!(args.updated_wda_bundle_id.as_deref(), Some("io.example.runner"));
    assert!(args.use_prebuilt_wda);
    assert!(args.prebuild_wda);
    assert_eq!(args.sdk_version.as_deref(), Some("14.5"));
    assert!(args.use_xctestrun_file);
    assert!(args.real_device);
    assert_eq!(args.show_xcode_log, Some(false));
}

#[test]
fn defaults() {
    let args = AgentArgs::default();
    assert_eq!(args.launch_timeout(), Duration::from_secs(60));
    assert_eq!(args.prebuild_delay(), Duration::ZERO);
    assert_eq!(args.connection_timeout(), None);
    assert_eq!(args.signing_id(), "iPhone Developer");
    assert!(!args.has_agent_url());
}

#[test]
fn empty_agent_url_is_not_an_override() {
    let args = AgentArgs { web_driver_agent_url: Some(String::new()), ..Default::default() };
    assert!(!args.has_agent_url());
}

#[test]
fn agent_path_defaults_under_bootstrap() {
    let args = AgentArgs { bootstrap_path: Some("/opt/wda".into()), ..Default::default() };
    assert_eq!(args.agent_path(), PathBuf::from("/opt/wda/WebDriverAgent.xcodeproj"));

    let args = AgentArgs {
        bootstrap_path: Some("/opt/wda".into()),
        agent_path: Some("/src/Custom.xcodeproj".into()),
        ..Default::default()
    };
    assert_eq!(args.agent_path(), PathBuf::from("/src/Custom.xcodeproj"));
}

#[test]
#[serial]
fn bootstrap_path_from_env() {
    std::env::set_var("WDA_BOOTSTRAP_PATH", "/tmp/wda-checkout");
    let path = AgentArgs::default().bootstrap_path();
    std::env::remove_var("WDA_BOOTSTRAP_PATH");
    assert_eq!(path, PathBuf::from("/tmp/wda-checkout"));
}

#[test]
fn load_from_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("agent.toml");
    std::fs::write(
        &path,
        r#"
platformVersion = "14.5.1"
wdaLaunchTimeout = 120000
prebuildDelay = 500
xcodeOrgId = "TEAM123"
"#,
    )
    .unwrap();

    let args = AgentArgs::load(&path).unwrap();
    assert_eq!(args.platform_version.as_deref(), Some("14.5.1"));
    assert_eq!(args.launch_timeout(), Duration::from_secs(120));
    assert_eq!(args.prebuild_delay(), Duration::from_millis(500));
    assert_eq!(args.xcode_org_id.as_deref(), Some("TEAM123"));
}

#[test]
fn load_reports_path_on_bad_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("agent.toml");
    std::fs::write(&path, "wdaLocalPort = \"not a port\"").unwrap();

    let err = AgentArgs::load(&path).unwrap_err();
    assert!(matches!(err, ArgsError::Toml { .. }));
    assert!(err.to_string().contains("agent.toml"));
}

#[test]
fn load_missing_file() {
    let err = AgentArgs::load(Path::new("/nonexistent/agent.toml")).unwrap_err();
    assert!(matches!(err, ArgsError::Io { .. }));
}
