// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Property list access through `plutil`.

use std::path::Path;

use crate::process::{ProcessAdapter, ProcessError};

/// Read a single value as text; `None` if the key is missing.
pub async fn extract_value<P: ProcessAdapter>(
    process: &P,
    path: &Path,
    key_path: &str,
) -> Result<Option<String>, ProcessError> {
    let args = vec![
        "-extract".to_string(),
        key_path.to_string(),
        "raw".to_string(),
        "-o".to_string(),
        "-".to_string(),
        path.display().to_string(),
    ];
    match process.exec("plutil", &args, None).await {
        Ok(output) => {
            let value = output.stdout.trim();
            Ok((!value.is_empty()).then(|| value.to_string()))
        }
        // plutil exits 1 when the key path does not resolve
        Err(ProcessError::Failed { code: 1, .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Set a string value, creating it if needed
pub async fn replace_value<P: ProcessAdapter>(
    process: &P,
    path: &Path,
    key_path: &str,
    value: &str,
) -> Result<(), ProcessError> {
    let args = vec![
        "-replace".to_string(),
        key_path.to_string(),
        "-string".to_string(),
        value.to_string(),
        path.display().to_string(),
    ];
    process.exec("plutil", &args, None).await?;
    Ok(())
}

#[cfg(test)]
#[path = "plist_tests.rs"]
mod tests;
