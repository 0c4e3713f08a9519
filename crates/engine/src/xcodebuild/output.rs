// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scanning of `xcodebuild` output.
//!
//! `xcodebuild` may exit 0 after a failed test launch, so the output itself
//! is watched for fatal errors. Lines are classified by the first matching
//! rule; the ignore rules take precedence over the fatal one.

use std::path::PathBuf;

/// Known benign errors that must never fail a run
const IGNORED: &[&str] = &[
    "Error writing attachment data to file",
    "Error copying testing attachment",
    "Failed to remove screenshot at path",
];

const FATAL: &str = "Error Domain=";
const DIAGNOSTIC_LOG: &str = "Writing diagnostic log for test session to";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Ignored,
    Fatal,
    DiagnosticLog,
    Plain,
}

pub fn classify(line: &str) -> LineKind {
    if IGNORED.iter().any(|pattern| line.contains(pattern)) {
        LineKind::Ignored
    } else if line.contains(FATAL) {
        LineKind::Fatal
    } else if line.contains(DIAGNOSTIC_LOG) {
        LineKind::DiagnosticLog
    } else {
        LineKind::Plain
    }
}

/// Accumulated state of one `xcodebuild` run's output
#[derive(Debug, Default)]
pub struct OutputScanner {
    show_xcode_log: Option<bool>,
    echo: bool,
    awaiting_log_path: bool,
    pub log_location: Option<PathBuf>,
    pub error_occurred: bool,
    pub error_message: String,
}

impl OutputScanner {
    /// `show_xcode_log`: `Some(true)` echoes everything, `Some(false)` never
    /// flags fatal errors, `None` echoes only once an error shows up.
    pub fn new(show_xcode_log: Option<bool>) -> Self {
        Self { show_xcode_log, echo: show_xcode_log == Some(true), ..Default::default() }
    }

    pub fn scan(&mut self, line: &str) {
        if self.awaiting_log_path {
            self.awaiting_log_path = false;
            if line.trim_start().starts_with('/') {
                self.set_log_location(line.trim());
            }
        }

        let kind = classify(line);
        match kind {
            LineKind::DiagnosticLog => {
                let rest = line.split_once(DIAGNOSTIC_LOG).map(|(_, rest)| rest).unwrap_or("");
                let rest = rest.trim_start().trim_start_matches(':').trim();
                if rest.starts_with('/') {
                    self.set_log_location(rest);
                } else {
                    self.awaiting_log_path = true;
                }
            }
            LineKind::Fatal if self.show_xcode_log != Some(false) => {
                self.echo = true;
                self.error_occurred = true;
            }
            _ => {}
        }

        if self.echo && kind != LineKind::Ignored {
            tracing::error!(target: "xcode", "{line}");
            if !line.is_empty() {
                self.error_message.push('\n');
                self.error_message.push_str(line);
            }
        }
    }

    fn set_log_location(&mut self, path: &str) {
        tracing::debug!(path, "log file for xcodebuild test");
        self.log_location = Some(PathBuf::from(path));
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
