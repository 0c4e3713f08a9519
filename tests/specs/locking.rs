// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project cleanup is serialized per bootstrap path.

use crate::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use wda_engine::{bootstrap_locks, cleanup_project_if_fresh, normalize_path, CleanupOutcome};

async fn locked_cleanup(bootstrap: &Path, home: &Path, cleans: &AtomicUsize) -> CleanupOutcome {
    let key = normalize_path(bootstrap).display().to_string();
    let source = FixedTimestamp(Some("100".into()));
    bootstrap_locks()
        .run(
            &key,
            cleanup_project_if_fresh(Some(home), bootstrap, &source, || async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                cleans.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        )
        .await
}

#[tokio::test(start_paused = true)]
async fn shared_checkout_is_cleaned_once() {
    let home = tempfile::tempdir().unwrap();
    let cleans = AtomicUsize::new(0);

    let (first, second) = tokio::join!(
        locked_cleanup(Path::new("/opt/wda-shared"), home.path(), &cleans),
        locked_cleanup(Path::new("/opt/./wda-shared/"), home.path(), &cleans),
    );

    let mut outcomes = vec![first, second];
    outcomes.sort_by_key(|outcome| *outcome == CleanupOutcome::Cleaned);
    assert_eq!(outcomes, vec![CleanupOutcome::AlreadyFresh, CleanupOutcome::Cleaned]);
    assert_eq!(cleans.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn separate_checkouts_do_not_wait_for_each_other() {
    let (home_a, home_b) = (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap());
    let cleans = AtomicUsize::new(0);
    let started = tokio::time::Instant::now();

    let (a, b) = tokio::join!(
        locked_cleanup(Path::new("/opt/wda-a"), home_a.path(), &cleans),
        locked_cleanup(Path::new("/opt/wda-b"), home_b.path(), &cleans),
    );

    assert_eq!((a, b), (CleanupOutcome::Cleaned, CleanupOutcome::Cleaned));
    assert!(started.elapsed() < Duration::from_millis(400));
}
