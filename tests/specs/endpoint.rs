// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Where the manager expects the agent to listen.

use crate::prelude::*;

#[yare::parameterized(
    defaults      = { None, None, "http://127.0.0.1:8100/" },
    local_port    = { None, Some(9100), "http://127.0.0.1:9100/" },
    mock_base     = { Some("http://mockurl"), Some(9100), "http://mockurl:9100/" },
    mock_base_dir = { Some("http://mockurl/"), Some(9100), "http://mockurl:9100/" },
)]
fn default_endpoint(base: Option<&str>, port: Option<u16>, expected: &str) {
    let args = AgentArgs {
        wda_base_url: base.map(str::to_string),
        wda_local_port: port,
        ..Default::default()
    };
    let w = world().args(args).build();
    assert_eq!(w.agent.url().unwrap().href(), expected);
}

#[test]
fn setting_url_replaces_derived_parts() {
    let w = world().args(AgentArgs { wda_local_port: Some(9100), ..Default::default() }).build();
    assert_eq!(w.agent.url().unwrap().port(), 9100);

    w.agent.set_url("http://10.0.0.3:8400/prefix").unwrap();
    let endpoint = w.agent.url().unwrap();
    assert_eq!(endpoint.hostname(), "10.0.0.3");
    assert_eq!(endpoint.port(), 8400);
    assert_eq!(endpoint.base_path(), "/prefix");
    assert_eq!(w.agent.url().unwrap(), endpoint);
}

#[tokio::test]
async fn status_goes_through_base_path() {
    let args = AgentArgs {
        web_driver_agent_url: Some("http://10.0.0.3:8400/prefix".into()),
        ..Default::default()
    };
    let w = world().args(args).build();
    w.transport.respond("/prefix/status", 200, status_with_build(json!({})));

    assert!(w.agent.is_running().await);
    assert_eq!(w.transport.urls(), vec!["http://10.0.0.3:8400/prefix/status"]);
}

#[test]
fn args_load_from_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wda.toml");
    std::fs::write(
        &path,
        "platformName = \"tvOS\"\nwdaLocalPort = 8500\nupdatedWDABundleId = \"io.example.wda\"\n",
    )
    .unwrap();

    let args = AgentArgs::load(&path).unwrap();
    let w = world().args(args).build();
    assert_eq!(w.agent.url().unwrap().port(), 8500);
    assert_eq!(w.agent.xcodebuild().config().wda_remote_port, 8500);
    assert!(w.agent.xcodebuild().config().platform.is_tvos());
}
