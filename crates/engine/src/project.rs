// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mutations of the agent project and its build inputs.

use std::path::{Path, PathBuf};

use wda_adapters::{argv, plist, ProcessAdapter};
use wda_core::constants::{PROJECT_FILE, WDA_RUNNER_BUNDLE_ID};
use wda_core::{BuildConfig, Platform};

use crate::error::AgentError;

fn project_file(agent_path: &Path) -> PathBuf {
    agent_path.join(PROJECT_FILE)
}

fn backup_file(agent_path: &Path) -> PathBuf {
    agent_path.join(format!("{PROJECT_FILE}.old"))
}

/// Point the runner target at `bundle_id`, keeping a backup of the original.
///
/// Best effort: a failure is logged and the build goes ahead with whatever
/// the project holds.
pub async fn update_project_file(agent_path: &Path, bundle_id: &str) {
    let project = project_file(agent_path);
    let result = async {
        tokio::fs::copy(&project, backup_file(agent_path)).await?;
        let content = tokio::fs::read_to_string(&project).await?;
        tokio::fs::write(&project, content.replace(WDA_RUNNER_BUNDLE_ID, bundle_id)).await
    }
    .await;
    match result {
        Ok(()) => {
            tracing::debug!(path = %project.display(), bundle_id, "updated project bundle id")
        }
        Err(e) => tracing::warn!(
            path = %project.display(),
            bundle_id,
            error = %e,
            "unable to update project file, WebDriverAgent may not start"
        ),
    }
}

/// Restore the project file from its backup, if there is one
pub async fn reset_project_file(agent_path: &Path) {
    let backup = backup_file(agent_path);
    if !tokio::fs::try_exists(&backup).await.unwrap_or(false) {
        return;
    }
    let project = project_file(agent_path);
    match tokio::fs::rename(&backup, &project).await {
        Ok(()) => tracing::debug!(path = %project.display(), "reset project bundle id"),
        Err(e) => {
            tracing::warn!(path = %project.display(), error = %e, "unable to reset project file")
        }
    }
}

/// Toolchain-generated test-run descriptor name for `version`
pub fn xctestrun_file_name(platform: Platform, real_device: bool, version: &str) -> String {
    let prefix = if platform.is_tvos() {
        "WebDriverAgentRunner_tvOS_appletv"
    } else {
        "WebDriverAgentRunner_iphone"
    };
    let target = if real_device {
        format!("os{version}-arm64")
    } else {
        format!("simulator{version}-x86_64")
    };
    format!("{prefix}{target}.xctestrun")
}

/// Locate the per-device `.xctestrun` file, copying it from the
/// toolchain-generated one on first use.
pub async fn resolve_xctestrun_file(config: &BuildConfig) -> Result<PathBuf, AgentError> {
    let bootstrap = &config.bootstrap_path;
    let versions = [config.sdk_version.as_deref(), config.platform_version.as_deref()];
    for version in versions.into_iter().flatten() {
        let per_device = bootstrap.join(format!("{}_{version}.xctestrun", config.udid));
        if tokio::fs::try_exists(&per_device).await.unwrap_or(false) {
            tracing::info!(path = %per_device.display(), "using xctestrun file");
            return Ok(per_device);
        }
        let original =
            bootstrap.join(xctestrun_file_name(config.platform, config.real_device, version));
        if tokio::fs::try_exists(&original).await.unwrap_or(false) {
            tokio::fs::copy(&original, &per_device).await.map_err(|e| {
                AgentError::io(format!("cannot copy '{}'", original.display()), e)
            })?;
            tracing::info!(
                path = %per_device.display(),
                from = %original.display(),
                "using copied xctestrun file"
            );
            return Ok(per_device);
        }
    }

    let expected_version = config.sdk_version.as_deref().unwrap_or_default();
    Err(AgentError::XctestrunNotFound(bootstrap.join(xctestrun_file_name(
        config.platform,
        config.real_device,
        expected_version,
    ))))
}

/// Resolve the `.xctestrun` file and point its runner at `port`
pub async fn set_xctestrun_file<P: ProcessAdapter>(
    process: &P,
    config: &BuildConfig,
) -> Result<PathBuf, AgentError> {
    let path = resolve_xctestrun_file(config).await?;
    let key = format!("{}.EnvironmentVariables.USE_PORT", config.platform.runner_scheme());
    plist::replace_value(process, &path, &key, &config.wda_remote_port.to_string()).await?;
    Ok(path)
}

/// Write a temporary `.xcconfig` carrying the signing team and identity
pub async fn generate_xcode_config_file(
    org_id: &str,
    signing_id: &str,
) -> Result<PathBuf, AgentError> {
    tracing::debug!(org_id, signing_id, "generating xcode config file");
    let contents = format!("DEVELOPMENT_TEAM = {org_id}\nCODE_SIGN_IDENTITY = {signing_id}\n");
    let path = std::env::temp_dir().join(format!("wda-{}.xcconfig", uuid::Uuid::new_v4()));
    tokio::fs::write(&path, contents)
        .await
        .map_err(|e| AgentError::io(format!("cannot write '{}'", path.display()), e))?;
    tracing::debug!(path = %path.display(), "wrote xcode config file");
    Ok(path)
}

/// Unlock the signing keychain for a real-device build
pub async fn set_real_device_security<P: ProcessAdapter>(
    process: &P,
    keychain_path: &Path,
    keychain_password: &str,
) -> Result<(), AgentError> {
    tracing::debug!("setting security for iOS device");
    let keychain = keychain_path.display().to_string();
    let keychain = keychain.as_str();
    process.exec("security", &argv(&["-v", "list-keychains", "-s", keychain]), None).await?;
    let unlock = argv(&["-v", "unlock-keychain", "-p", keychain_password, keychain]);
    process.exec("security", &unlock, None).await?;
    let settings = argv(&["set-keychain-settings", "-t", "3600", "-l", keychain]);
    process.exec("security", &settings, None).await?;
    Ok(())
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;
