// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device capability interface.
//!
//! Real devices and simulators are provided by the embedding driver; this
//! crate only defines the operations the lifecycle code needs from them.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from device operations
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("failed to install {path}: {message}")]
    InstallFailed { path: String, message: String },
    #[error("failed to remove {bundle_id}: {message}")]
    RemoveFailed { bundle_id: String, message: String },
    #[error("device query failed: {0}")]
    Query(String),
}

/// A real device or simulator the agent runs on.
#[async_trait]
pub trait DeviceAdapter: Clone + Send + Sync + 'static {
    /// Device identifier
    fn udid(&self) -> &str;

    async fn is_app_installed(&self, bundle_id: &str) -> Result<bool, DeviceError>;

    async fn install_app(&self, app_path: &Path) -> Result<(), DeviceError>;

    async fn remove_app(&self, bundle_id: &str) -> Result<(), DeviceError>;

    /// Bundle ids of user-installed apps whose `CFBundleName` matches `bundle_name`
    async fn user_installed_bundle_ids_by_bundle_name(
        &self,
        bundle_name: &str,
    ) -> Result<Vec<String>, DeviceError>;
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{DeviceAdapter, DeviceError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::{HashMap, HashSet};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    /// Recorded device call
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum DeviceCall {
        IsAppInstalled(String),
        InstallApp(PathBuf),
        RemoveApp(String),
        ListByBundleName(String),
    }

    #[derive(Default)]
    struct FakeDeviceState {
        calls: Vec<DeviceCall>,
        installed: HashSet<String>,
        by_bundle_name: HashMap<String, Vec<String>>,
        failing_removals: HashSet<String>,
    }

    /// In-memory device for tests
    #[derive(Clone)]
    pub struct FakeDevice {
        udid: String,
        inner: Arc<Mutex<FakeDeviceState>>,
    }

    impl FakeDevice {
        pub fn new(udid: impl Into<String>) -> Self {
            Self { udid: udid.into(), inner: Arc::new(Mutex::new(FakeDeviceState::default())) }
        }

        /// Mark an app as installed
        pub fn with_installed(self, bundle_id: &str) -> Self {
            self.inner.lock().installed.insert(bundle_id.to_string());
            self
        }

        /// Set the ids returned for a bundle name lookup
        pub fn with_bundle_ids(self, bundle_name: &str, ids: &[&str]) -> Self {
            self.inner
                .lock()
                .by_bundle_name
                .insert(bundle_name.to_string(), ids.iter().map(|s| s.to_string()).collect());
            self
        }

        /// Make removal of `bundle_id` fail
        pub fn fail_removal(self, bundle_id: &str) -> Self {
            self.inner.lock().failing_removals.insert(bundle_id.to_string());
            self
        }

        pub fn calls(&self) -> Vec<DeviceCall> {
            self.inner.lock().calls.clone()
        }

        /// Bundle ids passed to `remove_app`, in call order
        pub fn removed(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    DeviceCall::RemoveApp(id) => Some(id),
                    _ => None,
                })
                .collect()
        }

        pub fn is_installed(&self, bundle_id: &str) -> bool {
            self.inner.lock().installed.contains(bundle_id)
        }
    }

    #[async_trait]
    impl DeviceAdapter for FakeDevice {
        fn udid(&self) -> &str {
            &self.udid
        }

        async fn is_app_installed(&self, bundle_id: &str) -> Result<bool, DeviceError> {
            let mut inner = self.inner.lock();
            inner.calls.push(DeviceCall::IsAppInstalled(bundle_id.to_string()));
            Ok(inner.installed.contains(bundle_id))
        }

        async fn install_app(&self, app_path: &Path) -> Result<(), DeviceError> {
            self.inner.lock().calls.push(DeviceCall::InstallApp(app_path.to_path_buf()));
            Ok(())
        }

        async fn remove_app(&self, bundle_id: &str) -> Result<(), DeviceError> {
            let mut inner = self.inner.lock();
            inner.calls.push(DeviceCall::RemoveApp(bundle_id.to_string()));
            if inner.failing_removals.contains(bundle_id) {
                return Err(DeviceError::RemoveFailed {
                    bundle_id: bundle_id.to_string(),
                    message: "simulated failure".to_string(),
                });
            }
            inner.installed.remove(bundle_id);
            Ok(())
        }

        async fn user_installed_bundle_ids_by_bundle_name(
            &self,
            bundle_name: &str,
        ) -> Result<Vec<String>, DeviceError> {
            let mut inner = self.inner.lock();
            inner.calls.push(DeviceCall::ListByBundleName(bundle_name.to_string()));
            Ok(inner.by_bundle_name.get(bundle_name).cloned().unwrap_or_default())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{DeviceCall, FakeDevice};
