// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! Behavioral specifications for the agent lifecycle.
//!
//! Each scenario drives a `WebDriverAgent` against the fake device, process
//! and transport adapters.

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/caching.rs"]
mod caching;
#[path = "specs/endpoint.rs"]
mod endpoint;
#[path = "specs/launch.rs"]
mod launch;
#[path = "specs/locking.rs"]
mod locking;
