// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wda-engine: builds, launches, reuses and tears down the on-device agent

pub mod agent;
mod error;
pub mod guard;
pub mod processes;
pub mod project;
pub mod timestamp;
pub mod xcodebuild;

pub use agent::{AgentDeps, PreparedWda, WebDriverAgent};
pub use error::AgentError;
pub use guard::{bootstrap_locks, normalize_path, KeyedLock};
pub use timestamp::{
    cleanup_project_if_fresh, CleanupOutcome, FixedTimestamp, ManifestTimestamp,
    UpgradeTimestampSource,
};
pub use xcodebuild::{LineKind, OutputScanner, XcodeBuild, XcodeCommand};
