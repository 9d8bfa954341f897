// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # encuentro-harness
//!
//! Scenario plumbing around the encuentro synchronization core:
//!
//! - [`ServerHarness`]: spawns the dispatch server under test, waits for
//!   its APIs to become reachable, and shuts it down gracefully
//! - [`Scenario`]: per-scenario rendezvous channel, mailbox registry, and
//!   handler lifecycle, scoped by a fresh [`ScenarioToken`]
//! - [`MockDispatchServer`]: an in-process stand-in dispatch server used
//!   by the harness's own test suite, so the full protocol can be
//!   exercised hermetically
//!
//! [`ScenarioToken`]: encuentro_core::types::ScenarioToken

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod mock;
pub mod scenario;
pub mod server;

pub use error::{HarnessError, Result};
pub use mock::MockDispatchServer;
pub use scenario::Scenario;
pub use server::ServerHarness;
