// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `xcodebuild` command line construction.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use wda_core::BuildConfig;

#[allow(clippy::expect_used)]
static MAJOR_MINOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.(\d+)").expect("constant regex pattern is valid"));

/// Runtime inputs that change between invocations of the same runner
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandOptions<'a> {
    pub build_only: bool,
    pub use_prebuilt: bool,
    pub xctestrun: Option<&'a Path>,
    pub derived_data: Option<&'a Path>,
    pub xcode_config_file: Option<&'a Path>,
    pub treat_warnings_as_errors: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XcodeCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl XcodeCommand {
    pub fn display(&self) -> String {
        format!("{} {}", self.program, self.args.join(" "))
    }
}

/// Build the `xcodebuild` invocation for a build and/or test pass.
pub fn build_command(config: &BuildConfig, opts: CommandOptions<'_>) -> XcodeCommand {
    let (build, test) = if config.use_simple_build_test {
        ("build", "test")
    } else {
        ("build-for-testing", "test-without-building")
    };

    let mut args: Vec<String> = if opts.build_only {
        vec![build.into()]
    } else if opts.use_prebuilt || config.use_xctestrun_file {
        vec![test.into()]
    } else {
        vec![build.into(), test.into()]
    };

    if config.allow_provisioning_device_registration {
        args.push("-allowProvisioningUpdates".into());
        args.push("-allowProvisioningDeviceRegistration".into());
    }
    if let Some(path) = &config.result_bundle_path {
        args.push("-resultBundlePath".into());
        args.push(path_arg(path));
    }
    if let Some(version) = &config.result_bundle_version {
        args.push("-resultBundleVersion".into());
        args.push(version.clone());
    }

    match opts.xctestrun.filter(|_| config.use_xctestrun_file) {
        Some(xctestrun) => {
            args.push("-xctestrun".into());
            args.push(path_arg(xctestrun));
        }
        None => {
            args.push("-project".into());
            args.push(path_arg(&config.agent_path));
            args.push("-scheme".into());
            args.push(config.platform.runner_scheme().into());
            if let Some(derived_data) = opts.derived_data {
                args.push("-derivedDataPath".into());
                args.push(path_arg(derived_data));
            }
        }
    }

    args.push("-destination".into());
    args.push(format!("id={}", config.udid));

    match config.platform_version.as_deref().and_then(deployment_target) {
        Some(target) => args.push(format!("IPHONEOS_DEPLOYMENT_TARGET={target}")),
        None => tracing::warn!(
            platform_version = ?config.platform_version,
            "cannot parse major and minor version numbers from platformVersion, \
             building for the default platform instead"
        ),
    }

    if config.real_device {
        if let Some(xcconfig) = opts.xcode_config_file {
            tracing::debug!(path = %xcconfig.display(), "using Xcode configuration file");
            args.push("-xcconfig".into());
            args.push(path_arg(xcconfig));
        }
    }

    if !opts.treat_warnings_as_errors {
        args.push("GCC_TREAT_WARNINGS_AS_ERRORS=0".into());
    }
    args.push("COMPILER_INDEX_STORE_ENABLE=NO".into());

    XcodeCommand { program: "xcodebuild".into(), args }
}

/// `major.minor` of a version string such as `14.5.1`
pub fn deployment_target(version: &str) -> Option<String> {
    let captures = MAJOR_MINOR.captures(version)?;
    Some(format!("{}.{}", &captures[1], &captures[2]))
}

/// `xcodebuild clean` for one scheme
pub fn clean_command(agent_path: &Path, scheme: &str) -> XcodeCommand {
    XcodeCommand {
        program: "xcodebuild".into(),
        args: vec![
            "clean".into(),
            "-project".into(),
            path_arg(agent_path),
            "-scheme".into(),
            scheme.into(),
        ],
    }
}

/// `xcodebuild -showBuildSettings` for the agent project
pub fn show_build_settings_command(agent_path: &Path) -> XcodeCommand {
    XcodeCommand {
        program: "xcodebuild".into(),
        args: vec!["-project".into(), path_arg(agent_path), "-showBuildSettings".into()],
    }
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

/// Path of the simulator build of the runner app under `derived_data`
pub fn simulator_app_path(derived_data: &Path) -> PathBuf {
    derived_data
        .join("Build/Products/Debug-iphonesimulator")
        .join(wda_core::constants::WDA_RUNNER_APP)
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
