//! Spawning and tearing down the dispatch server under test.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::{Child, Command};

use encuentro_client::{ControlClient, DataClient};
use encuentro_core::HarnessConfig;
use encuentro_core::types::{Route, RouteSpec};

use crate::error::{HarnessError, Result};
use crate::scenario::Scenario;

/// Poll interval while waiting for the server process to exit.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A running dispatch server plus clients for both of its surfaces.
#[derive(Debug)]
pub struct ServerHarness {
    config: HarnessConfig,
    child: Child,
    control: ControlClient,
    data: DataClient,
}

impl ServerHarness {
    /// Spawns the configured server command and waits for both APIs to
    /// answer, once per second up to the boot timeout.
    ///
    /// # Errors
    /// Fails with [`HarnessError::Boot`] if the process cannot be spawned,
    /// exits during boot, or its APIs stay unreachable past the timeout.
    /// The half-booted process is killed before the error is returned.
    pub async fn start(config: HarnessConfig) -> Result<Self> {
        config.validate()?;

        let mut argv = config.server_cmd.split_whitespace();
        let program = argv
            .next()
            .ok_or_else(|| HarnessError::boot("empty server command"))?;
        let mut child = Command::new(program)
            .args(argv)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| HarnessError::boot(format!("failed to spawn {program}: {e}")))?;
        tracing::info!(cmd = %config.server_cmd, pid = ?child.id(), "dispatch server spawned");

        if let Err(e) = wait_until_ready(&mut child, &config).await {
            let _ = child.start_kill();
            return Err(e);
        }

        Ok(Self {
            control: ControlClient::new(&config.control_url),
            data: DataClient::new(&config.user_url, &config.data_url),
            config,
            child,
        })
    }

    /// Returns the control-plane client.
    #[must_use]
    pub fn control(&self) -> &ControlClient {
        &self.control
    }

    /// Returns the data-plane client.
    #[must_use]
    pub fn data(&self) -> &DataClient {
        &self.data
    }

    /// Returns the configuration the harness was started with.
    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Installs a batch of routes, failing on the first rejection.
    ///
    /// # Errors
    /// Fails if any route is not accepted by the control API.
    pub async fn install_routes(&self, specs: &[RouteSpec]) -> Result<Vec<Route>> {
        let mut installed = Vec::with_capacity(specs.len());
        for spec in specs {
            installed.push(self.control.append_route(spec).await?);
        }
        Ok(installed)
    }

    /// Installs probe-handler routes for the given `(method, path)` pairs,
    /// all pointing at the scenario's rendezvous FIFO.
    ///
    /// # Errors
    /// Fails if any route is not accepted by the control API.
    pub async fn install_probe_routes(
        &self,
        scenario: &Scenario,
        routes: &[(&str, &str)],
    ) -> Result<Vec<Route>> {
        let entrypoint = scenario.probe_entrypoint();
        let specs: Vec<RouteSpec> = routes
            .iter()
            .map(|(method, path)| RouteSpec::new(*method, *path, entrypoint.clone()))
            .collect();
        self.install_routes(&specs).await
    }

    /// Shuts the server down: SIGTERM, wait up to `timeout`, then SIGKILL.
    ///
    /// # Errors
    /// Fails if the process cannot be reaped at all.
    pub async fn shutdown(mut self, timeout: Duration) -> Result<()> {
        let Some(pid) = self.child.id() else {
            // Already exited; reap and go.
            self.child.wait().await?;
            return Ok(());
        };
        tracing::info!(pid, ?timeout, "shutting down dispatch server");

        #[allow(clippy::cast_possible_wrap)] // pids fit in i32 on Unix
        let term = nix::sys::signal::kill(
            nix::unistd::Pid::from_raw(pid as i32),
            nix::sys::signal::Signal::SIGTERM,
        );
        if let Err(errno) = term {
            tracing::warn!(pid, %errno, "SIGTERM failed, process may already be gone");
        }

        let start = Instant::now();
        while start.elapsed() < timeout {
            if let Some(status) = self.child.try_wait()? {
                tracing::info!(pid, %status, elapsed = ?start.elapsed(), "server stopped");
                return Ok(());
            }
            tokio::time::sleep(EXIT_POLL_INTERVAL).await;
        }

        tracing::warn!(pid, "graceful shutdown timed out, sending SIGKILL");
        self.child
            .start_kill()
            .map_err(|e| HarnessError::shutdown(format!("SIGKILL failed: {e}")))?;
        let status = self.child.wait().await?;
        tracing::info!(pid, %status, "server killed");
        Ok(())
    }
}

/// Polls process liveness and API reachability once per second.
async fn wait_until_ready(child: &mut Child, config: &HarnessConfig) -> Result<()> {
    let probe = reqwest::Client::builder()
        .timeout(Duration::from_secs(1))
        .build()?;

    let attempts = config.boot_timeout.as_secs().max(1);
    for attempt in 0..attempts {
        if let Some(status) = child.try_wait()? {
            return Err(HarnessError::boot(format!(
                "server exited during boot: {status}"
            )));
        }

        // Any HTTP answer counts as reachable; readiness is about the
        // listener, not about what it says.
        let control_up = probe.head(&config.control_url).send().await.is_ok();
        let data_up = probe.head(&config.data_url).send().await.is_ok();
        if control_up && data_up {
            tracing::info!(attempt, "control and data APIs reachable");
            return Ok(());
        }

        tracing::debug!(attempt, control_up, data_up, "APIs not ready yet");
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    Err(HarnessError::boot(format!(
        "APIs unreachable after {:?}",
        config.boot_timeout
    )))
}
