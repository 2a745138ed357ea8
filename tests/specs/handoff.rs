//! Deployment handoff over the local file backend: an old instance holds the
//! lease, a new instance starting up takes it over cleanly.

use crate::prelude::{register_recording, release_log, wait_not_main};
use maindom_backends::{LocalFileLock, LocalLockConfig};
use maindom_core::{Coordinator, CoordinatorConfig, DomainKey};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn coordinator_in(dir: &TempDir, timeout: Duration) -> Coordinator {
    let key = DomainKey::derive("app1", dir.path());
    let config = LocalLockConfig::new(dir.path())
        .with_signal_poll_interval(Duration::from_millis(25))
        .with_lock_poll_interval(Duration::from_millis(25));
    Coordinator::new(
        Arc::new(LocalFileLock::new(key, config)),
        CoordinatorConfig::new().with_acquire_timeout(timeout),
    )
}

#[tokio::test]
async fn new_instance_displaces_old_and_releases_run_in_weight_order() {
    let dir = TempDir::new().unwrap();

    // Old instance starts and becomes main
    let old = coordinator_in(&dir, Duration::from_secs(2));
    assert!(old.acquire().await.unwrap());
    assert!(old.is_main_dom().await);

    let log = release_log();
    register_recording(&old, &log, 50).await;
    register_recording(&old, &log, 10).await;
    register_recording(&old, &log, 100).await;

    // New instance starts while the old one is still running
    let new = coordinator_in(&dir, Duration::from_secs(5));
    assert!(new.acquire().await.unwrap());

    // The old instance observed the signal and stepped down
    wait_not_main(&old, Duration::from_secs(5)).await;
    assert_eq!(*log.lock().unwrap(), vec![10, 50, 100]);
    assert!(new.is_main_dom().await);

    new.stop().await;
}

#[tokio::test]
async fn startup_fails_fast_when_holder_never_yields() {
    use maindom_core::{LockBackend, MainDomError};

    let dir = TempDir::new().unwrap();

    // A holder that never listens and never steps down (e.g. a hung old
    // instance): pin the lease with a raw backend
    let key = DomainKey::derive("app1", dir.path());
    let pinned = LocalFileLock::new(key, LocalLockConfig::new(dir.path()));
    assert!(pinned.acquire(Duration::from_secs(1)).await.unwrap());

    let instance = coordinator_in(&dir, Duration::from_millis(300));
    let err = instance.acquire().await.unwrap_err();
    assert!(matches!(err, MainDomError::AcquireTimeout { .. }));
    assert!(!instance.is_main_dom().await);

    pinned.dispose().await.unwrap();
}

#[tokio::test]
async fn graceful_shutdown_without_contender_drains_registrations() {
    let dir = TempDir::new().unwrap();

    let instance = coordinator_in(&dir, Duration::from_secs(2));
    assert!(instance.acquire().await.unwrap());

    let log = release_log();
    register_recording(&instance, &log, 10).await;
    register_recording(&instance, &log, 100).await;

    instance.stop().await;

    assert_eq!(*log.lock().unwrap(), vec![10, 100]);
    assert!(!instance.is_main_dom().await);

    // The lease is free again for a successor process
    let successor = coordinator_in(&dir, Duration::from_secs(2));
    assert!(successor.acquire().await.unwrap());
    successor.stop().await;
}
