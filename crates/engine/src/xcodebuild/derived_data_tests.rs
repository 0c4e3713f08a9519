// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn two_levels_above_build_dir() {
    let settings = "Build settings for action build and target WebDriverAgentLib:\n    \
        ACTION = build\n    \
        BUILD_DIR = /Users/me/Library/Developer/Xcode/DerivedData/WebDriverAgent-abc/Build/Products\n    \
        BUILD_ROOT = /elsewhere\n";
    assert_eq!(
        parse_derived_data_root(settings),
        Some(PathBuf::from("/Users/me/Library/Developer/Xcode/DerivedData/WebDriverAgent-abc"))
    );
}

#[test]
fn first_match_wins() {
    let settings = "BUILD_DIR = /a/b/Build/Products\nBUILD_DIR = /x/y/Build/Products\n";
    assert_eq!(parse_derived_data_root(settings), Some(PathBuf::from("/a/b")));
}

#[test]
fn no_build_dir() {
    assert_eq!(parse_derived_data_root("CONFIGURATION = Debug\n"), None);
    assert_eq!(parse_derived_data_root("BUILD_DIR = relative/path\n"), None);
}
