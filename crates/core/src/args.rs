// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Caller-supplied agent options.
//!
//! Keys follow the capability names drivers already use (`wdaLocalPort`,
//! `webDriverAgentUrl`, `updatedWDABundleId`, ...). Every field is optional;
//! defaults are applied by the accessors, not at deserialization time.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{DEFAULT_SIGNING_ID, WDA_LAUNCH_TIMEOUT, WDA_PROJECT_NAME};

#[derive(Debug, Error)]
pub enum ArgsError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid agent options in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid agent options: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentArgs {
    pub platform_name: Option<String>,
    pub platform_version: Option<String>,
    #[serde(rename = "iosSdkVersion")]
    pub sdk_version: Option<String>,
    pub real_device: bool,
    pub host: Option<String>,

    pub wda_local_port: Option<u16>,
    pub wda_remote_port: Option<u16>,
    pub wda_base_url: Option<String>,
    /// Already running agent to attach to instead of building one
    pub web_driver_agent_url: Option<String>,
    pub mjpeg_server_port: Option<u16>,

    pub bootstrap_path: Option<PathBuf>,
    pub agent_path: Option<PathBuf>,
    pub derived_data_path: Option<PathBuf>,
    pub wda_bundle_path: Option<PathBuf>,
    #[serde(rename = "updatedWDABundleId")]
    pub updated_wda_bundle_id: Option<String>,

    #[serde(rename = "prebuildWDA")]
    pub prebuild_wda: bool,
    #[serde(rename = "usePrebuiltWDA")]
    pub use_prebuilt_wda: bool,
    pub use_simple_build_test: bool,
    pub use_xctestrun_file: bool,
    pub show_xcode_log: Option<bool>,
    pub allow_provisioning_device_registration: bool,
    pub result_bundle_path: Option<PathBuf>,
    pub result_bundle_version: Option<String>,

    pub xcode_config_file: Option<PathBuf>,
    pub xcode_org_id: Option<String>,
    pub xcode_signing_id: Option<String>,
    pub keychain_path: Option<PathBuf>,
    pub keychain_password: Option<String>,

    /// Milliseconds
    pub wda_launch_timeout: Option<u64>,
    /// Milliseconds
    pub wda_connection_timeout: Option<u64>,
    /// Milliseconds
    pub prebuild_delay: Option<u64>,
}

impl AgentArgs {
    /// Load options from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ArgsError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ArgsError::Io { path: path.to_path_buf(), source })?;
        toml::from_str(&content)
            .map_err(|source| ArgsError::Toml { path: path.to_path_buf(), source })
    }

    /// Build options from a capabilities-style JSON object.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ArgsError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn bootstrap_path(&self) -> PathBuf {
        self.bootstrap_path.clone().unwrap_or_else(crate::env::bootstrap_path)
    }

    pub fn agent_path(&self) -> PathBuf {
        self.agent_path.clone().unwrap_or_else(|| self.bootstrap_path().join(WDA_PROJECT_NAME))
    }

    pub fn launch_timeout(&self) -> Duration {
        self.wda_launch_timeout.map(Duration::from_millis).unwrap_or(WDA_LAUNCH_TIMEOUT)
    }

    pub fn connection_timeout(&self) -> Option<Duration> {
        self.wda_connection_timeout.map(Duration::from_millis)
    }

    pub fn prebuild_delay(&self) -> Duration {
        Duration::from_millis(self.prebuild_delay.unwrap_or(0))
    }

    pub fn signing_id(&self) -> &str {
        self.xcode_signing_id.as_deref().unwrap_or(DEFAULT_SIGNING_ID)
    }

    /// True when an externally managed agent URL was supplied.
    pub fn has_agent_url(&self) -> bool {
        self.web_driver_agent_url.as_deref().is_some_and(|url| !url.is_empty())
    }
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
