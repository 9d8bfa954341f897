//! Per-scenario synchronization state.

use std::path::{Path, PathBuf};
use std::time::Duration;

use encuentro_client::{PendingRequest, ResponseSnapshot};
use encuentro_core::HarnessConfig;
use encuentro_core::types::{HandlerId, ScenarioToken};
use encuentro_sync::{HandlerHandle, LifecycleController, RendezvousChannel, RequestRegistry};

use crate::error::Result;

/// Overrides probe-binary resolution for a whole harness run.
pub const ENV_PROBE_BIN: &str = "ENCUENTRO_PROBE_BIN";

/// One test scenario's worth of synchronization state.
///
/// Everything is scoped by a fresh [`ScenarioToken`]: the rendezvous FIFO
/// lives in the system temp directory and the marker mailbox under the
/// configured base, both named by the token. Dropping the scenario removes
/// both, so concurrent scenarios never collide and nothing leaks between
/// runs.
#[derive(Debug)]
pub struct Scenario {
    token: ScenarioToken,
    channel: RendezvousChannel,
    registry: RequestRegistry,
    controller: LifecycleController,
    probe_bin: Option<PathBuf>,
}

impl Scenario {
    /// Creates the scenario's FIFO and mailbox.
    ///
    /// # Errors
    /// Fails if either cannot be created.
    pub fn new(config: &HarnessConfig) -> Result<Self> {
        let token = ScenarioToken::new();
        let fifo = std::env::temp_dir().join(format!("encuentro-{token}.fifo"));
        let channel = RendezvousChannel::create(fifo)?;
        let registry = RequestRegistry::create(&config.mailbox_base, &token)?;
        tracing::debug!(%token, "scenario created");
        Ok(Self {
            token,
            channel,
            registry,
            controller: LifecycleController::new(),
            probe_bin: None,
        })
    }

    /// Pins the probe binary to an explicit path instead of resolving it.
    #[must_use]
    pub fn with_probe_bin(mut self, path: impl Into<PathBuf>) -> Self {
        self.probe_bin = Some(path.into());
        self
    }

    /// Returns the scenario token.
    #[must_use]
    pub const fn token(&self) -> ScenarioToken {
        self.token
    }

    /// Returns the rendezvous FIFO path.
    #[must_use]
    pub fn fifo_path(&self) -> &Path {
        self.channel.path()
    }

    /// Returns the marker mailbox directory.
    #[must_use]
    pub fn mailbox(&self) -> &Path {
        self.registry.mailbox()
    }

    /// Builds the entrypoint command line for a probe that reports through
    /// the rendezvous FIFO.
    #[must_use]
    pub fn probe_entrypoint(&self) -> String {
        format!(
            "{} --fifo {}",
            self.probe_bin().display(),
            self.fifo_path().display()
        )
    }

    /// Builds the entrypoint command line for a probe that drops a marker
    /// into the scenario mailbox.
    #[must_use]
    pub fn probe_mailbox_entrypoint(&self) -> String {
        format!(
            "{} --mailbox {}",
            self.probe_bin().display(),
            self.mailbox().display()
        )
    }

    /// Waits for the probe's handshake and returns a handle for the live
    /// handler.
    ///
    /// # Errors
    /// Propagates rendezvous failures, including deadline expiry.
    pub async fn await_handshake(&self, deadline: Duration) -> Result<HandlerHandle> {
        let shake = self.channel.await_handshake(deadline).await?;
        Ok(shake.into())
    }

    /// Waits for a request marker and returns the discovered handler id.
    ///
    /// # Errors
    /// Propagates discovery failures, including deadline expiry.
    pub async fn discover_marker(&self, deadline: Duration) -> Result<HandlerId> {
        Ok(self.registry.discover_marker(deadline).await?)
    }

    /// Returns true if the handler's process still exists.
    #[must_use]
    pub fn is_alive(&self, handle: &HandlerHandle) -> bool {
        self.controller.is_alive(handle)
    }

    /// Releases a held-open handler.
    ///
    /// # Errors
    /// Propagates signal-delivery failures; a dead handler is fatal.
    pub fn release(&self, handle: &HandlerHandle) -> Result<()> {
        Ok(self.controller.release(handle)?)
    }

    /// Releases the handler and joins the request it was holding open.
    ///
    /// # Errors
    /// Propagates release and join failures.
    pub async fn release_and_join(
        &self,
        handle: &HandlerHandle,
        pending: PendingRequest,
        deadline: Duration,
    ) -> Result<ResponseSnapshot> {
        Ok(self
            .controller
            .release_and_join(handle, pending, deadline)
            .await?)
    }

    /// Resolves the probe binary: explicit override, then the
    /// `ENCUENTRO_PROBE_BIN` variable, then a sibling of the current
    /// executable, then plain `$PATH` lookup.
    fn probe_bin(&self) -> PathBuf {
        if let Some(path) = &self.probe_bin {
            return path.clone();
        }
        if let Ok(path) = std::env::var(ENV_PROBE_BIN) {
            return PathBuf::from(path);
        }
        if let Some(path) = sibling_probe_bin() {
            return path;
        }
        PathBuf::from("encuentro-probe")
    }
}

/// Looks for `encuentro-probe` next to the current executable, stepping
/// out of cargo's `deps` directory when running under a test binary.
fn sibling_probe_bin() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let mut dir = exe.parent()?;
    if dir.file_name().is_some_and(|name| name == "deps") {
        dir = dir.parent()?;
    }
    let candidate = dir.join("encuentro-probe");
    candidate.is_file().then_some(candidate)
}
