// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build configuration handed to the build runner.

use std::path::PathBuf;
use std::time::Duration;

use crate::args::AgentArgs;
use crate::constants::WDA_AGENT_PORT;
use crate::platform::Platform;

/// Immutable view of the options that shape one build/test invocation.
///
/// Resolved once from [`AgentArgs`] and the target device id. The only value
/// the runner discovers later is the derived data path, which it keeps
/// separately.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    pub udid: String,
    pub platform: Platform,
    pub platform_version: Option<String>,
    pub sdk_version: Option<String>,
    pub real_device: bool,

    pub bootstrap_path: PathBuf,
    pub agent_path: PathBuf,
    pub derived_data_path: Option<PathBuf>,

    pub use_simple_build_test: bool,
    pub use_xctestrun_file: bool,
    pub use_prebuilt_wda: bool,
    pub show_xcode_log: Option<bool>,
    pub allow_provisioning_device_registration: bool,
    pub result_bundle_path: Option<PathBuf>,
    pub result_bundle_version: Option<String>,

    pub xcode_config_file: Option<PathBuf>,
    pub xcode_org_id: Option<String>,
    pub xcode_signing_id: String,
    pub keychain_path: Option<PathBuf>,
    pub keychain_password: Option<String>,
    pub updated_wda_bundle_id: Option<String>,

    /// Port the agent listens on inside the device; follows the local port
    /// unless set explicitly
    pub wda_remote_port: u16,
    pub mjpeg_server_port: Option<u16>,

    pub launch_timeout: Duration,
    pub prebuild_delay: Duration,
}

impl BuildConfig {
    pub fn from_args(args: &AgentArgs, udid: impl Into<String>) -> Self {
        Self {
            udid: udid.into(),
            platform: Platform::from_name(args.platform_name.as_deref()),
            platform_version: args.platform_version.clone(),
            sdk_version: args.sdk_version.clone(),
            real_device: args.real_device,
            bootstrap_path: args.bootstrap_path(),
            agent_path: args.agent_path(),
            derived_data_path: args.derived_data_path.clone(),
            use_simple_build_test: args.use_simple_build_test,
            use_xctestrun_file: args.use_xctestrun_file,
            use_prebuilt_wda: args.use_prebuilt_wda,
            show_xcode_log: args.show_xcode_log,
            allow_provisioning_device_registration: args.allow_provisioning_device_registration,
            result_bundle_path: args.result_bundle_path.clone(),
            result_bundle_version: args.result_bundle_version.clone(),
            xcode_config_file: args.xcode_config_file.clone(),
            xcode_org_id: args.xcode_org_id.clone(),
            xcode_signing_id: args.signing_id().to_string(),
            keychain_path: args.keychain_path.clone(),
            keychain_password: args.keychain_password.clone(),
            updated_wda_bundle_id: args.updated_wda_bundle_id.clone(),
            wda_remote_port: args.wda_remote_port.or(args.wda_local_port).unwrap_or(WDA_AGENT_PORT),
            mjpeg_server_port: args.mjpeg_server_port,
            launch_timeout: args.launch_timeout(),
            prebuild_delay: args.prebuild_delay(),
        }
    }

    /// Whether toolchain output should be echoed without an error to trigger it.
    pub fn echo_xcode_log(&self) -> bool {
        self.show_xcode_log == Some(true)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
