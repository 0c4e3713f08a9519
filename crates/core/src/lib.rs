// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wda-core: data types shared by the WebDriverAgent lifecycle crates

pub mod args;
pub mod config;
pub mod constants;
pub mod endpoint;
pub mod env;
pub mod platform;
pub mod status;

pub use args::{AgentArgs, ArgsError};
pub use config::BuildConfig;
pub use endpoint::{AgentEndpoint, EndpointError};
pub use platform::Platform;
pub use status::{AgentStatus, BuildInfo, IosInfo, OsInfo};
