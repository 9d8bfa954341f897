// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # encuentro-sync
//!
//! The synchronization protocol at the heart of the encuentro harness: the
//! primitives that let a single driver deterministically observe and
//! control requests serviced by out-of-process handlers.
//!
//! - [`RendezvousChannel`]: a named FIFO through which a spawned handler
//!   reports its `(pid, handler_id)` handshake back to the driver
//! - [`RequestRegistry`]: a scenario-scoped mailbox directory for
//!   discovering handlers triggered indirectly, with no rendezvous channel
//! - [`LifecycleController`]: releases a held-open handler by SIGTERM and
//!   joins the background request that triggered it
//!
//! Every blocking wait takes an explicit deadline and fails with
//! [`SyncError::TimedOut`] instead of hanging the suite. All failures are
//! fatal: a broken rendezvous means the scenario cannot proceed, so nothing
//! here retries.
//!
//! Unix only: the protocol is built on FIFOs and signals.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod lifecycle;
pub mod registry;
pub mod rendezvous;

pub use error::{Result, SyncError};
pub use lifecycle::{HandlerHandle, LifecycleController};
pub use registry::RequestRegistry;
pub use rendezvous::{Handshake, RendezvousChannel};
