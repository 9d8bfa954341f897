//! Encuentro: test orchestration for HTTP route-dispatch servers.
//!
//! The harness boots the server under test, installs routes through its
//! control API, drives requests through its data path, and rendezvouses
//! with the handler processes the server spawns so scenarios can hold
//! requests open and release them deliberately.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use encuentro::prelude::*;
//! use std::time::Duration;
//!
//! # async fn run() -> encuentro::harness::Result<()> {
//! let config = HarnessConfig::from_env()?;
//! let server = ServerHarness::start(config).await?;
//! let scenario = Scenario::new(server.config())?;
//!
//! server.install_probe_routes(&scenario, &[("GET", "/hello")]).await?;
//! let pending = server.data().get_in_background("/hello");
//! let handle = scenario.await_handshake(Duration::from_secs(5)).await?;
//!
//! let response = scenario
//!     .release_and_join(&handle, pending, Duration::from_secs(5))
//!     .await?;
//! assert_eq!(response.status, 200);
//! server.shutdown(Duration::from_secs(10)).await?;
//! # Ok(())
//! # }
//! ```

pub use encuentro_client as client;
pub use encuentro_core as core;
pub use encuentro_harness as harness;
pub use encuentro_sync as sync;

/// Prelude module for common imports.
pub mod prelude {
    pub use encuentro_client::{ControlClient, DataClient, PendingRequest, ResponseSnapshot};
    pub use encuentro_core::HarnessConfig;
    pub use encuentro_core::types::{HandlerId, Route, RoutePosition, RouteSpec, ScenarioToken};
    pub use encuentro_harness::{Scenario, ServerHarness};
    pub use encuentro_sync::{HandlerHandle, LifecycleController};
}
