// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # encuentro-core
//!
//! Shared foundation for the encuentro test-orchestration harness.
//!
//! This crate provides the types every other encuentro crate builds on:
//!
//! - [`RouteSpec`] / [`Route`] for the dispatch server's route collection
//! - [`HandlerId`] and [`ScenarioToken`] identifiers
//! - [`HarnessConfig`] read from environment variables
//! - [`json::is_subset`] for partial response-body assertions

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod json;
pub mod types;

pub use config::HarnessConfig;
pub use error::{ConfigError, Result};
pub use types::{HandlerId, Route, RoutePosition, RouteSpec, ScenarioToken};
