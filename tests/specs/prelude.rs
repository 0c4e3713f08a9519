// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![allow(dead_code, unused_imports)]

//! Shared fixtures for the scenarios

pub use serde_json::json;
pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;
pub use wda_adapters::{FakeDevice, FakeProcessAdapter, FakeSpawn, FakeTransport};
pub use wda_core::constants::{WDA_CF_BUNDLE_NAME, WDA_PROJECT_NAME, WDA_RUNNER_BUNDLE_ID};
pub use wda_core::AgentArgs;
pub use wda_engine::{AgentDeps, AgentError, FixedTimestamp, WebDriverAgent};

pub type Agent = WebDriverAgent<FakeDevice, FakeProcessAdapter, FakeTransport>;

pub const UDID: &str = "00008030-001A2C3E0C42802E";

/// A manager wired to fakes, with a private home and agent checkout
pub struct World {
    pub agent: Agent,
    pub device: FakeDevice,
    pub process: FakeProcessAdapter,
    pub transport: FakeTransport,
    pub home: tempfile::TempDir,
    pub checkout: tempfile::TempDir,
}

pub struct WorldBuilder {
    args: AgentArgs,
    device: FakeDevice,
    timestamp: Option<String>,
}

impl WorldBuilder {
    pub fn args(mut self, args: AgentArgs) -> Self {
        self.args = args;
        self
    }

    pub fn device(mut self, device: FakeDevice) -> Self {
        self.device = device;
        self
    }

    pub fn timestamp(mut self, timestamp: &str) -> Self {
        self.timestamp = Some(timestamp.to_string());
        self
    }

    pub fn build(self) -> World {
        let home = tempfile::tempdir().unwrap();
        let checkout = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(checkout.path().join(WDA_PROJECT_NAME)).unwrap();

        let mut args = self.args;
        if args.bootstrap_path.is_none() {
            args.bootstrap_path = Some(checkout.path().to_path_buf());
        }

        let process = FakeProcessAdapter::new();
        let transport = FakeTransport::new();
        let agent = WebDriverAgent::new(
            args,
            AgentDeps {
                device: self.device.clone(),
                process: process.clone(),
                transport: transport.clone(),
            },
        )
        .with_timestamp_source(Arc::new(FixedTimestamp(self.timestamp)))
        .with_home(Some(home.path().to_path_buf()));

        World { agent, device: self.device, process, transport, home, checkout }
    }
}

pub fn world() -> WorldBuilder {
    WorldBuilder { args: AgentArgs::default(), device: FakeDevice::new(UDID), timestamp: None }
}

/// `/status` response body carrying `build`
pub fn status_with_build(build: serde_json::Value) -> serde_json::Value {
    json!({
        "value": {
            "state": "success",
            "os": { "name": "iOS", "version": "14.5", "sdkVersion": "14.5" },
            "ios": { "ip": "192.168.1.20" },
            "build": build,
        },
        "sessionId": null,
    })
}
