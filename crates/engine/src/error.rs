// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use thiserror::Error;
use wda_adapters::{DeviceError, ProcessError, ProxyError, XcTestError};
use wda_core::EndpointError;

/// Errors surfaced by the agent lifecycle
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Proxy(#[from] ProxyError),
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
    #[error("Trying to use WebDriverAgent project at '{0}' but the file does not exist")]
    MissingProject(PathBuf),
    #[error("{message}")]
    BuildFailed { code: Option<i32>, message: String },
    #[error("unable to start WebDriverAgent: {0}")]
    LaunchFailed(String),
    #[error("Unable to extract bundle id from '{0}'")]
    BundleIdNotFound(PathBuf),
    #[error("Cannot find a WebDriverAgent bundle under '{0}'")]
    BundleNotFound(PathBuf),
    #[error(
        "If you are using useXctestrunFile capability then you need to have a xctestrun file \
         (expected: '{0}')"
    )]
    XctestrunNotFound(PathBuf),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    XcTest(#[from] XcTestError),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl AgentError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        AgentError::Io { context: context.into(), source }
    }
}
