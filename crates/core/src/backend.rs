// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pluggable mutual-exclusion primitive behind the coordinator
//!
//! A backend provides two things: a machine- or cluster-wide token that at
//! most one instance holds, and a signal channel telling the current holder
//! that another instance wants the token. The coordinator is agnostic to
//! which backend it runs on.

use crate::error::BackendError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::watch;

/// A mutual-exclusion token plus a "someone wants the token" signal channel.
///
/// Implementations: a local file lock for multiple processes on one machine,
/// and a shared-database row for instances spread across machines.
#[async_trait]
pub trait LockBackend: Send + Sync {
    /// Raise the wake signal for the current holder (if any), then try to
    /// take the token, waiting up to `timeout`.
    ///
    /// `Ok(false)` is the normal timed-out outcome. Implementations must
    /// reset the signal channel before returning, whether or not the token
    /// was obtained, so a new holder never observes its own wake-up.
    async fn acquire(&self, timeout: Duration) -> Result<bool, BackendError>;

    /// Resolve when another instance wants the token, or when `shutdown`
    /// fires. Called once, after a successful `acquire`, from a background
    /// task; must not block the acquiring thread.
    async fn listen(&self, shutdown: watch::Receiver<bool>) -> Result<(), BackendError>;

    /// Release the token and tear down backend resources. Idempotent.
    async fn dispose(&self) -> Result<(), BackendError>;
}

/// Scripted backend for coordinator tests.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeBackend {
    state: std::sync::Mutex<FakeState>,
    signal: tokio::sync::Notify,
}

#[cfg(any(test, feature = "test-support"))]
struct FakeState {
    acquire_results: std::collections::VecDeque<Result<bool, BackendError>>,
    acquire_calls: u32,
    disposed: bool,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeBackend {
    /// A backend whose next acquire yields `result`; any further acquire
    /// yields `Ok(false)`.
    pub fn acquiring(result: bool) -> Self {
        let backend = Self::new();
        backend.push_acquire(Ok(result));
        backend
    }

    pub fn new() -> Self {
        Self {
            state: std::sync::Mutex::new(FakeState {
                acquire_results: std::collections::VecDeque::new(),
                acquire_calls: 0,
                disposed: false,
            }),
            signal: tokio::sync::Notify::new(),
        }
    }

    /// Queue the outcome of the next acquire call.
    pub fn push_acquire(&self, result: Result<bool, BackendError>) {
        self.lock_state().acquire_results.push_back(result);
    }

    /// Make the pending `listen` resolve, as if another instance raised the
    /// wake signal.
    pub fn raise_signal(&self) {
        self.signal.notify_one();
    }

    pub fn acquire_calls(&self) -> u32 {
        self.lock_state().acquire_calls
    }

    pub fn disposed(&self) -> bool {
        self.lock_state().disposed
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl LockBackend for FakeBackend {
    async fn acquire(&self, _timeout: Duration) -> Result<bool, BackendError> {
        let mut state = self.lock_state();
        state.acquire_calls += 1;
        state.acquire_results.pop_front().unwrap_or(Ok(false))
    }

    async fn listen(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), BackendError> {
        tokio::select! {
            _ = self.signal.notified() => {}
            _ = shutdown.changed() => {}
        }
        Ok(())
    }

    async fn dispose(&self) -> Result<(), BackendError> {
        self.lock_state().disposed = true;
        Ok(())
    }
}
