// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! maindom-core: single-writer election and handoff for co-hosted instances
//!
//! Among all running instances of an application that share on-disk or
//! database resources, exactly one at a time is the "main" instance and
//! allowed to write to them. This crate provides:
//! - **Coordinator** - the acquisition state machine and release registry
//! - **LockBackend** - the pluggable mutual-exclusion + signal primitive
//! - **DomainKey** - stable identity scoping the lease to one app/path

pub mod backend;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod key;
pub mod registration;

// Re-exports
pub use backend::LockBackend;
pub use config::CoordinatorConfig;
pub use coordinator::Coordinator;
pub use error::{BackendError, MainDomError};
pub use key::DomainKey;
pub use registration::{Callback, CallbackResult, Registration, DEFAULT_WEIGHT};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use backend::FakeBackend;
