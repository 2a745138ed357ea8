//! Shared fixtures for the election specs.

use maindom_core::Coordinator;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Poll until the coordinator reports not-main, failing after `deadline`.
pub async fn wait_not_main(coordinator: &Coordinator, deadline: Duration) {
    tokio::time::timeout(deadline, async {
        while coordinator.is_main_dom().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("coordinator never gave up main status");
}

/// A shared log that release callbacks append their weight to.
pub fn release_log() -> Arc<Mutex<Vec<i32>>> {
    Arc::new(Mutex::new(Vec::new()))
}

/// Register a release callback on `coordinator` that records `weight`.
pub async fn register_recording(
    coordinator: &Coordinator,
    log: &Arc<Mutex<Vec<i32>>>,
    weight: i32,
) {
    let log = Arc::clone(log);
    let accepted = coordinator
        .register(
            None,
            Some(Box::new(move || {
                log.lock().unwrap().push(weight);
                Ok(())
            })),
            weight,
        )
        .await;
    assert!(accepted, "registration rejected while main");
}
