// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named in-process locks.
//!
//! Work that touches a shared agent checkout runs under a lock keyed by the
//! normalized checkout path: callers on the same path take turns, callers on
//! different paths never wait for each other. The lock is advisory and only
//! covers this process.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;

static BOOTSTRAP_LOCKS: LazyLock<KeyedLock> = LazyLock::new(KeyedLock::new);

/// Lock table shared by every manager in the process
pub fn bootstrap_locks() -> &'static KeyedLock {
    &BOOTSTRAP_LOCKS
}

/// Set of async mutexes addressed by string key.
///
/// Entries are created on first use and dropped once nobody holds or waits
/// on them.
#[derive(Default)]
pub struct KeyedLock {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyedLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `fut` while holding the lock for `key`
    pub async fn run<F, T>(&self, key: &str, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        let lock = Arc::clone(self.locks.lock().entry(key.to_string()).or_default());
        let result = {
            let _held = lock.lock().await;
            fut.await
        };

        let mut locks = self.locks.lock();
        // One reference in the table, one here
        if Arc::strong_count(&lock) == 2 {
            locks.remove(key);
        }
        result
    }

    /// Number of keys currently held or awaited
    pub fn active_keys(&self) -> usize {
        self.locks.lock().len()
    }
}

/// Absolute, lexically normalized form of `path`.
///
/// `.` and `..` components are resolved without touching the filesystem, so
/// symlinks are not followed.
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
