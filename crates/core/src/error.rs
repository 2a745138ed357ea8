// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for lease acquisition and backends

use std::time::Duration;
use thiserror::Error;

/// Unexpected failure from a lock backend.
///
/// A timed-out acquisition is *not* an error; backends report it as
/// `Ok(false)`. Anything here means the mutual-exclusion guarantee can no
/// longer be trusted and must propagate.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("lock file i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("lock store: {source}")]
    Store {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl BackendError {
    /// Wrap a store-level failure (database driver errors and the like).
    pub fn store(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Store {
            source: Box::new(source),
        }
    }
}

/// Coordinator-level errors
#[derive(Debug, Error)]
pub enum MainDomError {
    /// The backend could not obtain the token within the configured timeout.
    /// Definitive for this process; never retried internally.
    #[error("timed out acquiring the main-instance lease after {timeout:?}")]
    AcquireTimeout { timeout: Duration },

    /// A previous acquisition attempt in this process already failed.
    /// Repeated calls replay this instead of consulting the backend again.
    #[error("main-instance lease acquisition already failed in this process")]
    AcquireFailed,

    #[error(transparent)]
    Backend(#[from] BackendError),
}
