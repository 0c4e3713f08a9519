// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed names and defaults of the WebDriverAgent project.

use std::time::Duration;

/// Port the agent listens on when no local port is configured
pub const WDA_AGENT_PORT: u16 = 8100;

/// Base URL the agent endpoint is derived from
pub const WDA_BASE_URL: &str = "http://127.0.0.1";

/// Bundle id the checked-in runner project is signed with
pub const WDA_RUNNER_BUNDLE_ID: &str = "com.facebook.WebDriverAgentRunner";

/// `CFBundleName` shared by every installed runner, whatever its bundle id
pub const WDA_CF_BUNDLE_NAME: &str = "WebDriverAgentRunner-Runner";

/// Name of the built runner app bundle
pub const WDA_RUNNER_APP: &str = "WebDriverAgentRunner-Runner.app";

/// Name of the XCTest bundle embedded in the runner app
pub const WDA_RUNNER_XCTEST: &str = "WebDriverAgentRunner.xctest";

/// Xcode project directory inside the bootstrap path
pub const WDA_PROJECT_NAME: &str = "WebDriverAgent.xcodeproj";

/// Project file inside the `.xcodeproj` directory
pub const PROJECT_FILE: &str = "project.pbxproj";

/// Location of the persisted upgrade timestamp, relative to the home directory
pub const WDA_UPGRADE_TIMESTAMP_PATH: &str = ".appium/webdriveragent/upgrade.time";

/// Manifest whose modification time marks the version of the agent sources
pub const UPGRADE_MANIFEST: &str = "package.json";

/// Path of the health endpoint
pub const STATUS_PATH: &str = "/status";

/// Default signing identity for real-device builds
pub const DEFAULT_SIGNING_ID: &str = "iPhone Developer";

/// Default time to wait for the agent to answer on its health endpoint
pub const WDA_LAUNCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Request timeout used for one-off status queries
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(3);
