// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-device XCTest execution helper.
//!
//! Used when the agent is started directly on the device instead of through
//! `xcodebuild`. The implementation is supplied by the embedding driver.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XcTestError {
    #[error("failed to install test bundle {path}: {message}")]
    Install { path: String, message: String },
    #[error("failed to run XCUITest: {0}")]
    Run(String),
}

#[async_trait]
pub trait XcTestRunner: Send + Sync + 'static {
    /// Install an `.xctest` bundle and return its test bundle id
    async fn install_xctest_bundle(&self, path: &Path) -> Result<String, XcTestError>;

    /// Start the UI test that hosts the agent
    async fn run_xcui_test(
        &self,
        runner_bundle_id: &str,
        app_bundle_id: &str,
        test_bundle_id: &str,
        env: &BTreeMap<String, String>,
    ) -> Result<(), XcTestError>;
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{XcTestError, XcTestRunner};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum XcTestCall {
        Install(PathBuf),
        Run {
            runner_bundle_id: String,
            app_bundle_id: String,
            test_bundle_id: String,
            env: BTreeMap<String, String>,
        },
    }

    #[derive(Clone, Default)]
    pub struct FakeXcTestRunner {
        calls: Arc<Mutex<Vec<XcTestCall>>>,
    }

    impl FakeXcTestRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<XcTestCall> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl XcTestRunner for FakeXcTestRunner {
        async fn install_xctest_bundle(&self, path: &Path) -> Result<String, XcTestError> {
            self.calls.lock().push(XcTestCall::Install(path.to_path_buf()));
            let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("xctest");
            Ok(format!("com.facebook.{name}"))
        }

        async fn run_xcui_test(
            &self,
            runner_bundle_id: &str,
            app_bundle_id: &str,
            test_bundle_id: &str,
            env: &BTreeMap<String, String>,
        ) -> Result<(), XcTestError> {
            self.calls.lock().push(XcTestCall::Run {
                runner_bundle_id: runner_bundle_id.to_string(),
                app_bundle_id: app_bundle_id.to_string(),
                test_bundle_id: test_bundle_id.to_string(),
                env: env.clone(),
            });
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeXcTestRunner, XcTestCall};
