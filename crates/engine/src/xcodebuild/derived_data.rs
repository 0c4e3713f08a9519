// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::guard::normalize_path;

#[allow(clippy::expect_used)]
static BUILD_DIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*BUILD_DIR\s+=\s+(/.*)").expect("constant regex pattern is valid")
});

/// Derived data root from `xcodebuild -showBuildSettings` output.
///
/// `BUILD_DIR` points at `<root>/Build/Products`.
pub fn parse_derived_data_root(settings: &str) -> Option<PathBuf> {
    let captures = BUILD_DIR.captures(settings)?;
    let build_dir = normalize_path(Path::new(captures[1].trim_end()));
    tracing::debug!(build_dir = %build_dir.display(), "parsed BUILD_DIR");
    Some(build_dir.parent()?.parent()?.to_path_buf())
}

#[cfg(test)]
#[path = "derived_data_tests.rs"]
mod tests;
