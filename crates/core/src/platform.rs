// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Target platform family.

use std::fmt;

/// Platform family the agent is built for.
///
/// Scheme and destination names differ between the two families; everything
/// else about the build is identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Platform {
    #[default]
    Ios,
    TvOs,
}

impl Platform {
    /// Classify a free-form platform name (`"iOS"`, `"tvOS"`, ...).
    ///
    /// Anything that is not tvOS (case-insensitive) is treated as iOS.
    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            Some(n) if n.eq_ignore_ascii_case("tvos") => Platform::TvOs,
            _ => Platform::Ios,
        }
    }

    pub fn is_tvos(self) -> bool {
        matches!(self, Platform::TvOs)
    }

    /// Scheme that builds the agent library
    pub fn lib_scheme(self) -> &'static str {
        match self {
            Platform::Ios => "WebDriverAgentLib",
            Platform::TvOs => "WebDriverAgentLib_tvOS",
        }
    }

    /// Scheme that builds and runs the agent test runner
    pub fn runner_scheme(self) -> &'static str {
        match self {
            Platform::Ios => "WebDriverAgentRunner",
            Platform::TvOs => "WebDriverAgentRunner_tvOS",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Ios => write!(f, "iOS"),
            Platform::TvOs => write!(f, "tvOS"),
        }
    }
}

#[cfg(test)]
#[path = "platform_tests.rs"]
mod tests;
