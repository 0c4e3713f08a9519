// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reuse of an agent that is already running on the device.

use crate::prelude::*;

fn installed(ids: &[&str]) -> FakeDevice {
    FakeDevice::new(UDID).with_bundle_ids(WDA_CF_BUNDLE_NAME, ids)
}

#[tokio::test]
async fn nothing_running_means_nothing_to_cache() {
    let w = world().device(installed(&["a.xctrunner"])).build();
    w.transport.refuse("/status");

    w.agent.setup_caching().await;

    assert!(w.device.removed().is_empty());
    assert_eq!(w.agent.web_driver_agent_url(), None);
}

#[tokio::test]
async fn matching_agent_is_reused_by_launch() {
    let w = world().timestamp("42").build();
    w.transport.respond(
        "/status",
        200,
        status_with_build(json!({
            "time": "Oct 16 2026 10:00:00",
            "productBundleIdentifier": WDA_RUNNER_BUNDLE_ID,
            "upgradedAt": "42",
        })),
    );

    w.agent.setup_caching().await;
    assert_eq!(w.agent.web_driver_agent_url().as_deref(), Some("http://127.0.0.1:8100/"));

    let status = w.agent.launch(Some("s-2")).await.unwrap().unwrap();
    assert_eq!(status.build.unwrap().upgraded_at().as_deref(), Some("42"));
    assert!(w.process.spawn_calls().is_empty());
    assert!(w.process.exec_calls().is_empty());

    w.agent.quit().await;
    assert_eq!(w.agent.web_driver_agent_url(), None);
}

#[tokio::test]
async fn agent_from_other_sources_is_uninstalled() {
    let w = world()
        .device(installed(&["com.facebook.WebDriverAgentRunner.xctrunner"]))
        .timestamp("2")
        .build();
    w.transport.respond("/status", 200, status_with_build(json!({ "upgradedAt": "1" })));

    w.agent.setup_caching().await;

    assert_eq!(w.device.removed(), vec!["com.facebook.WebDriverAgentRunner.xctrunner"]);
    assert_eq!(w.agent.web_driver_agent_url(), None);
}

#[tokio::test]
async fn bundle_id_mismatch_outranks_matching_version() {
    let args =
        AgentArgs { updated_wda_bundle_id: Some("io.example.wda".into()), ..Default::default() };
    let w = world()
        .args(args)
        .device(installed(&["a.xctrunner", "b.xctrunner"]))
        .timestamp("7")
        .build();
    w.transport.respond(
        "/status",
        200,
        status_with_build(json!({
            "productBundleIdentifier": "io.example.other",
            "upgradedAt": "7",
        })),
    );

    w.agent.setup_caching().await;

    assert_eq!(w.device.removed(), vec!["a.xctrunner", "b.xctrunner"]);
    assert_eq!(w.agent.web_driver_agent_url(), None);
}

#[tokio::test]
async fn custom_port_is_remembered() {
    let w = world().args(AgentArgs { wda_local_port: Some(8300), ..Default::default() }).build();
    w.transport.respond("/status", 200, status_with_build(json!({ "time": "now" })));

    w.agent.setup_caching().await;
    assert_eq!(w.agent.web_driver_agent_url().as_deref(), Some("http://127.0.0.1:8300/"));
}
