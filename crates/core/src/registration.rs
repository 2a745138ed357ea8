// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Weighted release registrations
//!
//! Dependent subsystems that need exclusive access to a shared resource hand
//! the coordinator a release closure tagged with an ordering weight. When the
//! lease is given up, closures run exactly once, in ascending weight order
//! (lower weight first: "stop accepting writes" before "flush and close").

/// Outcome of an install or release callback
pub type CallbackResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// An install or release callback
pub type Callback = Box<dyn FnOnce() -> CallbackResult + Send>;

/// Weight used when a subsystem does not care about ordering
pub const DEFAULT_WEIGHT: i32 = 100;

/// A release callback waiting for the lease to be given up
pub struct Registration {
    pub weight: i32,
    release: Callback,
}

impl Registration {
    pub fn new(weight: i32, release: Callback) -> Self {
        Self { weight, release }
    }

    /// Consume the registration and run its release callback.
    pub fn release(self) -> CallbackResult {
        (self.release)()
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("weight", &self.weight)
            .finish_non_exhaustive()
    }
}

/// Order registrations for draining: ascending weight, stable within a
/// weight (subsystems registered first release first).
pub fn drain_order(mut registrations: Vec<Registration>) -> Vec<Registration> {
    registrations.sort_by_key(|r| r.weight);
    registrations
}

#[cfg(test)]
#[path = "registration_tests.rs"]
mod tests;
