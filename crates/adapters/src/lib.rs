// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wda-adapters: seams to the device, the host processes, the agent's HTTP
//! endpoint and the on-device test helper

pub mod device;
pub mod plist;
pub mod process;
pub mod proxy;
pub mod xctest;

pub use device::{DeviceAdapter, DeviceError};
pub use process::{
    argv, ExecOutput, ProcessAdapter, ProcessError, ProcessExit, ProcessStopper, SpawnSpec,
    SpawnedProcess, TokioProcessAdapter,
};
pub use proxy::{
    HttpMethod, NoSessionProxy, ProxyError, ProxyRequest, ProxyResponse, ProxyTransport,
    ReqwestTransport, SessionProxy, TimeoutGuard,
};
pub use xctest::{XcTestError, XcTestRunner};

#[cfg(any(test, feature = "test-support"))]
pub use device::{DeviceCall, FakeDevice};
#[cfg(any(test, feature = "test-support"))]
pub use process::{ExecCall, FakeProcessAdapter, FakeSpawn, SpawnCall};
#[cfg(any(test, feature = "test-support"))]
pub use proxy::FakeTransport;
#[cfg(any(test, feature = "test-support"))]
pub use xctest::{FakeXcTestRunner, XcTestCall};
