// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Lock backends for the main-instance coordinator
//!
//! Two implementations of [`maindom_core::LockBackend`]:
//! - **LocalFileLock** - exclusive file lock + signal file, for multiple
//!   processes on one machine
//! - **SqliteRowLock** - shared-database ownership row with a polling
//!   displacement check, for instances spread across machines

pub mod local;
pub mod sqlite;

pub use local::{LocalFileLock, LocalLockConfig};
pub use sqlite::{SqliteLockConfig, SqliteRowLock};
