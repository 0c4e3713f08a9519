// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.

use std::path::PathBuf;

/// Resolve the agent checkout: WDA_BOOTSTRAP_PATH > <data dir>/webdriveragent
pub fn bootstrap_path() -> PathBuf {
    if let Some(dir) = std::env::var_os("WDA_BOOTSTRAP_PATH").filter(|s| !s.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .map(|dir| dir.join("webdriveragent"))
        .unwrap_or_else(|| PathBuf::from("webdriveragent"))
}

/// Any value of `WDA_TREAT_WARNINGS_AS_ERRORS` keeps compiler warnings fatal.
pub fn treat_warnings_as_errors() -> bool {
    std::env::var_os("WDA_TREAT_WARNINGS_AS_ERRORS").is_some()
}

/// User home, where the upgrade timestamp is persisted
pub fn home_dir() -> Option<PathBuf> {
    dirs::home_dir()
}
