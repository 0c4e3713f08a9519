// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use wda_adapters::FakeProcessAdapter;

#[tokio::test]
async fn pgrep_output_is_parsed() {
    let process = FakeProcessAdapter::new();
    process.on_exec("pgrep", &["xcodebuild.*UDID"], "101\n102\nnot-a-pid\n");
    assert_eq!(pids_using_pattern(&process, "xcodebuild.*UDID").await, vec!["101", "102"]);
}

#[tokio::test]
async fn pgrep_no_match_is_empty() {
    let process = FakeProcessAdapter::new();
    process.on_exec_fail("pgrep", &[], 1);
    assert!(pids_using_pattern(&process, "anything").await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn escalates_signals_while_processes_remain() {
    let process = FakeProcessAdapter::new();
    process.on_exec("pgrep", &["pattern"], "42\n");

    kill_app_using_pattern(&process, "pattern").await;

    let kills: Vec<_> =
        process.exec_lines().into_iter().filter(|line| line.starts_with("kill")).collect();
    assert_eq!(kills, vec!["kill -2 42", "kill -15 42", "kill -9 42"]);
}

#[tokio::test]
async fn stops_when_nothing_matches() {
    let process = FakeProcessAdapter::new();
    process.on_exec_fail("pgrep", &[], 1);

    kill_app_using_pattern(&process, "pattern").await;
    assert_eq!(process.exec_lines(), vec!["pgrep -if pattern"]);
}

#[tokio::test]
async fn simulator_resets_more_patterns() {
    let process = FakeProcessAdapter::new();
    process.on_exec_fail("pgrep", &[], 1);

    reset_test_processes(&process, "UDID", true).await;
    let mut lines = process.exec_lines();
    lines.sort();
    assert_eq!(
        lines,
        vec!["pgrep -if UDID.*XCTRunner", "pgrep -if xcodebuild.*UDID", "pgrep -if xctest.*UDID"]
    );
}

#[tokio::test]
async fn real_device_resets_xcodebuild_only() {
    let process = FakeProcessAdapter::new();
    process.on_exec_fail("pgrep", &[], 1);

    reset_test_processes(&process, "UDID", false).await;
    assert_eq!(process.exec_lines(), vec!["pgrep -if xcodebuild.*UDID"]);
}

#[tokio::test]
async fn listening_pids_are_filtered_by_command_line() {
    let process = FakeProcessAdapter::new();
    process.on_exec("lsof", &["tcp:8100"], "11\n12\n");
    process.on_exec("ps", &["11"], "COMMAND\n/tmp/WebDriverAgentRunner-Runner OTHER\n");
    process.on_exec("ps", &["12"], "COMMAND\n/usr/bin/python\n");

    let pids =
        pids_listening_on_port(&process, 8100, |cmd| cmd.contains("/WebDriverAgentRunner")).await;
    assert_eq!(pids, vec!["11"]);
}

#[tokio::test]
async fn nothing_listening() {
    let process = FakeProcessAdapter::new();
    process.on_exec_fail("lsof", &[], 1);
    assert!(pids_listening_on_port(&process, 8100, |_| true).await.is_empty());
}
