//! Behavioral specifications for the main-instance election protocol.
//!
//! These tests are black-box: they drive full coordinator + backend stacks
//! sharing one on-disk resource, the way co-hosted application instances
//! would during an overlapping deployment.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/handoff.rs"]
mod handoff;

#[path = "specs/displacement.rs"]
mod displacement;
