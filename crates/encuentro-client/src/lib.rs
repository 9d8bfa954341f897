// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # encuentro-client
//!
//! Thin, stateless HTTP wrappers over the dispatch server's two surfaces:
//!
//! - [`ControlClient`] for route CRUD and handler-resource lookups on the
//!   control API
//! - [`DataClient`] for foreground and background requests through the
//!   data path
//!
//! Neither client retries, caches, or pools beyond what `reqwest` does on
//! its own: whatever status, reason phrase, and body the server returns is
//! surfaced verbatim as a [`ResponseSnapshot`] for the assertion layer.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod control;
pub mod data;
pub mod error;
pub mod response;

pub use control::ControlClient;
pub use data::{DataClient, PendingRequest};
pub use error::{ClientError, Result};
pub use response::ResponseSnapshot;
