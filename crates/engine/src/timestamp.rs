// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Upgrade-timestamp bookkeeping.
//!
//! The agent sources carry an upgrade timestamp. The last value a build was
//! cleaned for is persisted under the user's home; a newer source timestamp
//! means artifacts from an older checkout may still be around and the
//! project is cleaned once before the next build.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use wda_core::constants::{UPGRADE_MANIFEST, WDA_UPGRADE_TIMESTAMP_PATH};

use crate::error::AgentError;

/// Resolves the upgrade timestamp of the agent sources
#[async_trait]
pub trait UpgradeTimestampSource: Send + Sync {
    async fn current(&self, bootstrap_path: &Path) -> Option<String>;
}

/// Modification time of the checkout's manifest, in epoch milliseconds
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestTimestamp;

#[async_trait]
impl UpgradeTimestampSource for ManifestTimestamp {
    async fn current(&self, bootstrap_path: &Path) -> Option<String> {
        let manifest = bootstrap_path.join(UPGRADE_MANIFEST);
        let modified = tokio::fs::metadata(&manifest).await.ok()?.modified().ok()?;
        let millis = modified.duration_since(UNIX_EPOCH).ok()?.as_millis();
        Some(millis.to_string())
    }
}

/// A timestamp known up front
#[derive(Debug, Clone, Default)]
pub struct FixedTimestamp(pub Option<String>);

#[async_trait]
impl UpgradeTimestampSource for FixedTimestamp {
    async fn current(&self, _bootstrap_path: &Path) -> Option<String> {
        self.0.clone()
    }
}

/// What [`cleanup_project_if_fresh`] decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    NoHome,
    NoCurrentTimestamp,
    NotWritable,
    AlreadyFresh,
    WriteFailed,
    Cleaned,
    CleanFailed,
}

/// Location of the persisted timestamp under `home`
pub fn persisted_timestamp_path(home: &Path) -> PathBuf {
    home.join(WDA_UPGRADE_TIMESTAMP_PATH)
}

/// Clean the project once per source upgrade.
///
/// Never fails: every problem is logged and reported through the outcome so
/// a launch can go ahead regardless.
pub async fn cleanup_project_if_fresh<S, F, Fut>(
    home: Option<&Path>,
    bootstrap_path: &Path,
    source: &S,
    clean: F,
) -> CleanupOutcome
where
    S: UpgradeTimestampSource + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), AgentError>>,
{
    let Some(home) = home else {
        tracing::info!("no home folder, skipping WebDriverAgent project cleanup");
        return CleanupOutcome::NoHome;
    };
    let current = match source.current(bootstrap_path).await {
        Some(raw) => match raw.trim().parse::<i64>() {
            Ok(value) => value,
            Err(_) => {
                tracing::info!(
                    timestamp = %raw,
                    "upgrade timestamp is not an integer, skipping cleanup"
                );
                return CleanupOutcome::NoCurrentTimestamp;
            }
        },
        None => {
            tracing::info!(
                bootstrap = %bootstrap_path.display(),
                "no upgrade timestamp, skipping cleanup"
            );
            return CleanupOutcome::NoCurrentTimestamp;
        }
    };

    let persisted_path = persisted_timestamp_path(home);
    if tokio::fs::try_exists(&persisted_path).await.unwrap_or(false) {
        if let Err(e) = tokio::fs::OpenOptions::new().append(true).open(&persisted_path).await {
            tracing::info!(
                path = %persisted_path.display(),
                error = %e,
                "upgrade timestamp file is not writable, skipping cleanup"
            );
            return CleanupOutcome::NotWritable;
        }
        match tokio::fs::read_to_string(&persisted_path).await {
            Ok(content) => match content.trim().parse::<i64>() {
                Ok(recent) if recent >= current => {
                    tracing::info!(recent, current, "WebDriverAgent sources are up to date");
                    return CleanupOutcome::AlreadyFresh;
                }
                Ok(recent) => {
                    tracing::info!(recent, current, "WebDriverAgent sources have been upgraded");
                }
                Err(_) => {
                    tracing::warn!(
                        path = %persisted_path.display(),
                        "upgrade timestamp file is corrupted, overwriting it"
                    );
                }
            },
            Err(e) => {
                tracing::warn!(
                    path = %persisted_path.display(),
                    error = %e,
                    "cannot read upgrade timestamp"
                );
            }
        }
    }

    if let Err(e) = write_timestamp(&persisted_path, current).await {
        tracing::warn!(
            path = %persisted_path.display(),
            error = %e,
            "cannot persist upgrade timestamp, skipping cleanup"
        );
        return CleanupOutcome::WriteFailed;
    }

    match clean().await {
        Ok(()) => CleanupOutcome::Cleaned,
        Err(e) => {
            tracing::warn!(error = %e, "cannot clean WebDriverAgent project");
            CleanupOutcome::CleanFailed
        }
    }
}

async fn write_timestamp(path: &Path, value: i64) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, value.to_string()).await
}

#[cfg(test)]
#[path = "timestamp_tests.rs"]
mod tests;
