// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Acquisition state machine for the main-instance lease
//!
//! One coordinator is constructed per process and injected into every
//! subsystem that needs exclusivity. Its lifecycle is one-way:
//! not-main -> main (after a successful acquire) -> signaled/not-main
//! (terminal). Once signaled there is no re-acquire; the process is
//! expected to be tearing down.

use crate::backend::LockBackend;
use crate::config::CoordinatorConfig;
use crate::error::MainDomError;
use crate::registration::{drain_order, Callback, Registration, DEFAULT_WEIGHT};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Elects this process as the single writer for shared resources.
///
/// Cheap to clone; all clones share one state machine.
#[derive(Clone)]
pub struct Coordinator {
    shared: Arc<Shared>,
}

struct Shared {
    backend: Arc<dyn LockBackend>,
    config: CoordinatorConfig,
    state: Mutex<State>,
    shutdown_tx: watch::Sender<bool>,
}

#[derive(Default)]
struct State {
    /// The backend has been consulted (successfully or not). At most once
    /// per process.
    attempted: bool,
    is_main: bool,
    /// One-way flag; never cleared once set.
    signaled: bool,
    registrations: Vec<Registration>,
    listener: Option<JoinHandle<()>>,
}

impl Coordinator {
    pub fn new(backend: Arc<dyn LockBackend>, config: CoordinatorConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                backend,
                config,
                state: Mutex::new(State::default()),
                shutdown_tx,
            }),
        }
    }

    /// Try to become the main instance.
    ///
    /// Blocks up to the configured acquire timeout. The backend is consulted
    /// at most once per process: repeated or concurrent calls serialize on
    /// the state lock and observe the recorded outcome. Returns `Ok(false)`
    /// only when the coordinator was already signaled; a timed-out or failed
    /// acquisition is an error, by design not retried here, so the host can
    /// refuse to start without the exclusivity guarantee.
    pub async fn acquire(&self) -> Result<bool, MainDomError> {
        let mut state = self.shared.state.lock().await;

        if state.signaled {
            return Ok(false);
        }
        if state.attempted {
            return if state.is_main {
                Ok(true)
            } else {
                Err(MainDomError::AcquireFailed)
            };
        }

        state.attempted = true;
        let timeout = self.shared.config.acquire_timeout;
        debug!(?timeout, "acquiring main-instance lease");

        match self.shared.backend.acquire(timeout).await {
            Ok(true) => {
                state.is_main = true;
                state.listener = Some(self.spawn_listener());
                info!("main-instance lease acquired");
                Ok(true)
            }
            Ok(false) => {
                warn!(?timeout, "main-instance lease acquisition timed out");
                Err(MainDomError::AcquireTimeout { timeout })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Whether this process currently holds the lease.
    ///
    /// Triggers `acquire` on first call; afterwards reflects current state.
    /// Acquisition errors are logged and read as "not main".
    pub async fn is_main_dom(&self) -> bool {
        match self.acquire().await {
            Ok(is_main) => is_main,
            Err(e) => {
                warn!(error = %e, "not main: lease acquisition failed");
                false
            }
        }
    }

    /// Register a dependent resource.
    ///
    /// Runs `install` synchronously if this process is currently main, then
    /// retains `release` to run when main status is given up. Release
    /// callbacks run exactly once, never concurrently with each other, in
    /// ascending `weight` order (see [`DEFAULT_WEIGHT`]).
    ///
    /// Returns `false` without running `install` when the coordinator is not
    /// main or has already been signaled.
    pub async fn register(
        &self,
        install: Option<Callback>,
        release: Option<Callback>,
        weight: i32,
    ) -> bool {
        let mut state = self.shared.state.lock().await;

        if state.signaled || !state.is_main {
            debug!(weight, "registration rejected: not the main instance");
            return false;
        }

        if let Some(install) = install {
            if let Err(e) = install() {
                warn!(weight, error = %e, "install callback failed, registration rejected");
                return false;
            }
        }
        if let Some(release) = release {
            state.registrations.push(Registration::new(weight, release));
        }
        true
    }

    /// `register` with the default weight.
    pub async fn register_release(&self, release: Callback) -> bool {
        self.register(None, Some(release), DEFAULT_WEIGHT).await
    }

    /// Give up main status as part of a graceful host shutdown.
    ///
    /// Forces the signal path even if no competing instance ever showed up,
    /// then waits for the listener task so no background wait dangles.
    pub async fn stop(&self) {
        let _ = self.shared.shutdown_tx.send(true);
        Shared::on_signal(&self.shared).await;

        let listener = self.shared.state.lock().await.listener.take();
        if let Some(handle) = listener {
            if let Err(e) = handle.await {
                warn!(error = %e, "lease listener task did not shut down cleanly");
            }
        }
    }

    fn spawn_listener(&self) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        let shutdown_rx = self.shared.shutdown_tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = shared.backend.listen(shutdown_rx).await {
                warn!(error = %e, "lease listener failed, treating as displacement");
            }
            Shared::on_signal(&shared).await;
        })
    }
}

impl Shared {
    /// The one-shot release path: drain registrations in weight order, step
    /// down, dispose the backend. Safe to hit from the listener and from
    /// `stop` concurrently; the second caller finds `signaled` set and
    /// returns.
    async fn on_signal(shared: &Arc<Shared>) {
        let mut state = shared.state.lock().await;

        if state.signaled {
            return;
        }
        state.signaled = true;

        let registrations = drain_order(std::mem::take(&mut state.registrations));
        if state.is_main {
            info!(
                registrations = registrations.len(),
                "giving up main-instance status"
            );
        }
        for registration in registrations {
            let weight = registration.weight;
            // One broken subsystem must not keep the others from releasing
            if let Err(e) = registration.release() {
                warn!(weight, error = %e, "release callback failed");
            }
        }

        let was_main = state.is_main;
        state.is_main = false;
        if was_main {
            if let Err(e) = shared.backend.dispose().await {
                warn!(error = %e, "backend dispose failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
