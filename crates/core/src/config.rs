// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Coordinator configuration
///
/// Hosts fill this in from their own configuration layer; the coordinator
/// never reads files or environment variables itself.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// How long a single acquisition attempt may block before it is treated
    /// as a definitive failure
    #[serde(with = "humantime_serde")]
    pub acquire_timeout: Duration,
}

impl CoordinatorConfig {
    pub fn new() -> Self {
        Self {
            acquire_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
