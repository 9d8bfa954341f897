//! The handler probe the dispatch server runs as a route entrypoint.
//!
//! On startup the probe announces itself exactly one way:
//!
//! - `--fifo PATH`: writes the handshake line `<pid>;<handler_id>\n` to the
//!   rendezvous FIFO (blocking until the harness opens the read end), or
//! - `--mailbox DIR`: drops a marker file named after the handler id into
//!   the scenario mailbox.
//!
//! It then blocks until it receives SIGTERM, which keeps the dispatched
//! HTTP request open for as long as the harness wants it held.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::signal::unix::{SignalKind, signal};

/// Environment variable the dispatch server sets on every handler.
const ENV_HANDLER_ID: &str = "ENCUENTRO_HANDLER_ID";

#[derive(Debug, Parser)]
#[command(name = "encuentro-probe", about = "Held-open handler probe")]
struct Args {
    /// Rendezvous FIFO to write the handshake line to.
    #[arg(long, conflicts_with = "mailbox")]
    fifo: Option<PathBuf>,

    /// Mailbox directory to drop a marker file into.
    #[arg(long)]
    mailbox: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .try_init();

    let args = Args::parse();
    let handler_id = std::env::var(ENV_HANDLER_ID)
        .with_context(|| format!("{ENV_HANDLER_ID} is not set"))?;
    anyhow::ensure!(!handler_id.is_empty(), "{ENV_HANDLER_ID} is empty");
    let pid = std::process::id();

    // Register the handler before announcing so a release signal sent
    // right after the announcement is never missed.
    let mut sigterm = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;

    match (args.fifo, args.mailbox) {
        (Some(fifo), None) => {
            let line = format!("{pid};{handler_id}\n");
            // Opening the write end blocks until the harness reader shows
            // up, so keep it off the runtime thread.
            tokio::task::spawn_blocking(move || write_handshake(&fifo, &line))
                .await
                .context("handshake task failed")??;
        }
        (None, Some(mailbox)) => {
            let marker = mailbox.join(&handler_id);
            std::fs::write(&marker, format!("{handler_id}\n"))
                .with_context(|| format!("writing marker {}", marker.display()))?;
            tracing::debug!(pid, handler_id, marker = %marker.display(), "marker dropped");
        }
        _ => anyhow::bail!("exactly one of --fifo or --mailbox is required"),
    }

    tracing::debug!(pid, "announced, holding until SIGTERM");
    sigterm.recv().await;
    tracing::debug!(pid, "released");
    Ok(())
}

fn write_handshake(fifo: &std::path::Path, line: &str) -> anyhow::Result<()> {
    let mut pipe = std::fs::OpenOptions::new()
        .write(true)
        .open(fifo)
        .with_context(|| format!("opening fifo {}", fifo.display()))?;
    pipe.write_all(line.as_bytes())
        .with_context(|| format!("writing handshake to {}", fifo.display()))?;
    Ok(())
}
