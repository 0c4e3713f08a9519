// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cleanup of host processes left over from earlier runs.
//!
//! Everything here is best effort: failures are logged at debug level and the
//! caller carries on.

use std::time::Duration;

use tokio::task::JoinSet;
use wda_adapters::{argv, ProcessAdapter};

/// Signals tried in order until nothing matches any more
const KILL_SIGNALS: [i32; 3] = [2, 15, 9];
const KILL_PAUSE: Duration = Duration::from_millis(100);

/// Pids of processes whose command line matches `pattern` (case-insensitive)
pub async fn pids_using_pattern<P: ProcessAdapter>(process: &P, pattern: &str) -> Vec<String> {
    match process.exec("pgrep", &argv(&["-if", pattern]), None).await {
        Ok(output) => output
            .stdout
            .split_whitespace()
            .filter(|pid| pid.parse::<u32>().is_ok())
            .map(str::to_string)
            .collect(),
        Err(e) => {
            tracing::debug!(pattern, code = ?e.exit_code(), "pgrep found no matching processes");
            Vec::new()
        }
    }
}

/// Kill processes matching `pattern`, escalating INT, TERM, KILL
pub async fn kill_app_using_pattern<P: ProcessAdapter>(process: &P, pattern: &str) {
    for (i, signal) in KILL_SIGNALS.iter().enumerate() {
        let pids = pids_using_pattern(process, pattern).await;
        if pids.is_empty() {
            return;
        }
        let mut args = vec![format!("-{signal}")];
        args.extend(pids);
        if let Err(e) = process.exec("kill", &args, None).await {
            tracing::debug!(args = ?args, error = %e, "kill failed");
        }
        if i + 1 == KILL_SIGNALS.len() {
            return;
        }
        tokio::time::sleep(KILL_PAUSE).await;
    }
}

/// Kill test processes bound to the device `udid`
pub async fn reset_test_processes<P: ProcessAdapter>(process: &P, udid: &str, is_simulator: bool) {
    let mut patterns = vec![format!("xcodebuild.*{udid}")];
    if is_simulator {
        patterns.push(format!("{udid}.*XCTRunner"));
        patterns.push(format!("xctest.*{udid}"));
    }
    tracing::debug!(udid, ?patterns, "killing running test processes");

    let mut tasks = JoinSet::new();
    for pattern in patterns {
        let process = process.clone();
        tasks.spawn(async move { kill_app_using_pattern(&process, &pattern).await });
    }
    while tasks.join_next().await.is_some() {}
}

/// Pids listening on TCP `port` whose command line passes `filter`
pub async fn pids_listening_on_port<P, F>(process: &P, port: u16, filter: F) -> Vec<String>
where
    P: ProcessAdapter,
    F: Fn(&str) -> bool,
{
    let target = format!("tcp:{port}");
    let listening = match process.exec("lsof", &argv(&["-ti", target.as_str()]), None).await {
        Ok(output) => output.stdout,
        Err(_) => return Vec::new(),
    };

    let mut pids = Vec::new();
    for pid in listening.split('\n').map(str::trim).filter(|pid| !pid.is_empty()) {
        match process.exec("ps", &argv(&["-p", pid, "-o", "command"]), None).await {
            Ok(output) if filter(&output.stdout) => pids.push(pid.to_string()),
            Ok(_) => {}
            Err(e) => tracing::debug!(pid, error = %e, "cannot read process command line"),
        }
    }
    pids
}

#[cfg(test)]
#[path = "processes_tests.rs"]
mod tests;
