//! Cross-machine handoff over the shared-database backend: displacement is
//! detected by polling the ownership row, not by a push signal.

use crate::prelude::{register_recording, release_log, wait_not_main};
use maindom_backends::{SqliteLockConfig, SqliteRowLock};
use maindom_core::{Coordinator, CoordinatorConfig, DomainKey};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn coordinator_on(db: &Path) -> Coordinator {
    // One logical application; the database file is what the "machines" share
    let key = DomainKey::derive("app1", Path::new("/srv/app"));
    let config = SqliteLockConfig::new(db).with_poll_interval(Duration::from_millis(50));
    Coordinator::new(
        Arc::new(SqliteRowLock::new(key, config)),
        CoordinatorConfig::new().with_acquire_timeout(Duration::from_secs(2)),
    )
}

#[tokio::test]
async fn new_instance_displaces_old_across_the_shared_database() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("maindom.db");

    let old = coordinator_on(&db);
    assert!(old.acquire().await.unwrap());
    assert!(old.is_main_dom().await);

    let log = release_log();
    register_recording(&old, &log, 10).await;
    register_recording(&old, &log, 100).await;

    // An instance on "another machine" takes over by rewriting the row
    let new = coordinator_on(&db);
    assert!(new.acquire().await.unwrap());

    // The old holder notices within a few poll intervals and drains
    wait_not_main(&old, Duration::from_secs(5)).await;
    assert_eq!(*log.lock().unwrap(), vec![10, 100]);
    assert!(new.is_main_dom().await);

    new.stop().await;
}

#[tokio::test]
async fn database_lease_survives_holder_restart_cycle() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("maindom.db");

    let first = coordinator_on(&db);
    assert!(first.acquire().await.unwrap());
    first.stop().await;

    // A clean shutdown leaves no stale ownership behind
    let second = coordinator_on(&db);
    assert!(second.acquire().await.unwrap());
    assert!(second.is_main_dom().await);
    second.stop().await;
}
