// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Launching, failing and quitting the agent.

use crate::prelude::*;

#[tokio::test]
async fn provided_agent_url_is_used_verbatim() {
    let w = world()
        .args(AgentArgs {
            web_driver_agent_url: Some("https://127.0.0.1:8100/".into()),
            wda_base_url: Some("http://mockurl".into()),
            wda_local_port: Some(9100),
            ..Default::default()
        })
        .build();
    w.transport.respond("/status", 200, status_with_build(json!({ "time": "now" })));

    let status = w.agent.launch(Some("s-1")).await.unwrap();

    assert!(status.is_some());
    assert!(w.process.spawn_calls().is_empty());
    assert_eq!(w.transport.urls(), vec!["https://127.0.0.1:8100/status"]);
    assert_eq!(w.agent.url().unwrap().href(), "https://127.0.0.1:8100/");
}

#[tokio::test(start_paused = true)]
async fn build_and_start_on_simulator() {
    let w = world().timestamp("1700000000000").build();
    w.transport.refuse("/status").respond("/status", 200, status_with_build(json!({})));
    w.process.push_spawn(FakeSpawn::running(&["Test Suite 'All tests' started"]));

    let status = w.agent.launch(Some("s-1")).await.unwrap().unwrap();

    assert_eq!(status.device_ip(), Some("192.168.1.20"));
    assert_eq!(w.agent.xcodebuild().agent_url().as_deref(), Some("192.168.1.20"));

    let spawn = &w.process.spawn_calls()[0];
    assert_eq!(spawn.program, "xcodebuild");
    assert_eq!(spawn.cwd.as_deref(), Some(w.checkout.path()));
    assert_eq!(spawn.env_value("UPGRADE_TIMESTAMP"), Some("1700000000000"));
    assert!(spawn.args.contains(&format!("id={UDID}")));

    let session = w.agent.session_proxy().unwrap();
    assert_eq!(session.session_id().as_deref(), Some("s-1"));

    w.agent.quit().await;
    assert_eq!(w.process.stops(), 1);
    assert_eq!(session.session_id(), None);
}

#[tokio::test]
async fn failed_build_reports_toolchain_output() {
    let w = world().args(AgentArgs { show_xcode_log: Some(true), ..Default::default() }).build();
    w.transport.refuse("/status");
    w.process.push_spawn(FakeSpawn::exits(
        65,
        &[
            "Signing for \"WebDriverAgentRunner\" requires a development team.",
            "** TEST BUILD FAILED **",
        ],
    ));

    let err = w.agent.launch(None).await.unwrap_err();

    similar_asserts::assert_eq!(
        err.to_string(),
        "xcodebuild failed with code 65\nxcodebuild error message:\n\n\
         Signing for \"WebDriverAgentRunner\" requires a development team.\n\
         ** TEST BUILD FAILED **"
    );
}

#[tokio::test(start_paused = true)]
async fn slow_agent_times_out_softly() {
    let args = AgentArgs { wda_launch_timeout: Some(2_000), ..Default::default() };
    let w = world().args(args).build();
    w.transport.refuse("/status");
    w.process.push_spawn(FakeSpawn::running(&[]));

    let status = w.agent.launch(None).await.unwrap();

    assert!(status.is_none());
    assert_eq!(w.transport.urls().len(), 4);
    assert!(w.agent.xcodebuild().has_live_process());
    w.agent.quit().await;
}

#[tokio::test]
async fn missing_project_stops_launch() {
    let dir = tempfile::tempdir().unwrap();
    let w = world()
        .args(AgentArgs { bootstrap_path: Some(dir.path().to_path_buf()), ..Default::default() })
        .build();

    let err = w.agent.launch(None).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        format!(
            "Trying to use WebDriverAgent project at '{}' but the file does not exist",
            dir.path().join(WDA_PROJECT_NAME).display()
        )
    );
}

#[tokio::test]
async fn quit_and_uninstall_clears_the_device() {
    let device = FakeDevice::new(UDID)
        .with_bundle_ids(WDA_CF_BUNDLE_NAME, &["com.facebook.WebDriverAgentRunner.xctrunner"]);
    let w = world().device(device).build();

    w.agent.quit_and_uninstall().await;
    assert_eq!(w.device.removed(), vec!["com.facebook.WebDriverAgentRunner.xctrunner"]);
}

#[test]
#[serial_test::serial]
fn bootstrap_path_follows_environment() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("WDA_BOOTSTRAP_PATH", dir.path());
    let args = AgentArgs::default();
    let bootstrap = args.bootstrap_path();
    let agent_path = args.agent_path();
    std::env::remove_var("WDA_BOOTSTRAP_PATH");

    assert_eq!(bootstrap, dir.path());
    assert_eq!(agent_path, dir.path().join(WDA_PROJECT_NAME));
}
