//! The rendezvous channel between driver and spawned handler.
//!
//! The channel is a named FIFO. It must exist before the triggering
//! request is fired: the handler's open-for-write and the driver's
//! open-for-read then cannot race, which is what makes the handshake read
//! observe a write that happens-before it.

use std::io::Read;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};

use encuentro_core::types::HandlerId;

use crate::error::{Result, SyncError};

/// How often the non-blocking FIFO read is retried while waiting.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// The `(pid, handler_id)` pair a handler reports on startup.
///
/// Produced exactly once per handler invocation that uses the rendezvous
/// path; reading it consumes it (a FIFO read is one-shot).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    /// Operating-system process id of the handler.
    pub pid: i32,
    /// Server-minted id of the request handler.
    pub handler_id: HandlerId,
}

impl FromStr for Handshake {
    type Err = SyncError;

    /// Parses a `"<pid>;<handler_id>"` line.
    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (pid_part, id_part) = line
            .split_once(';')
            .ok_or_else(|| SyncError::handshake(format!("no separator in {line:?}")))?;
        let pid: i32 = pid_part
            .trim()
            .parse()
            .map_err(|_| SyncError::handshake(format!("bad pid in {line:?}")))?;
        if pid <= 0 {
            return Err(SyncError::handshake(format!("non-positive pid in {line:?}")));
        }
        let handler_id = HandlerId::new(id_part.trim());
        if handler_id.is_empty() {
            return Err(SyncError::handshake(format!("empty handler id in {line:?}")));
        }
        Ok(Self { pid, handler_id })
    }
}

/// A single-use named synchronization channel backed by a FIFO.
///
/// Create the channel, install the route whose entrypoint names the FIFO,
/// fire the request, then [`await_handshake`]. One handshake per channel;
/// the FIFO is unlinked on drop.
///
/// [`await_handshake`]: RendezvousChannel::await_handshake
#[derive(Debug)]
pub struct RendezvousChannel {
    path: PathBuf,
}

impl RendezvousChannel {
    /// Creates the FIFO at `path` (mode 0600).
    ///
    /// # Errors
    /// Fails if the FIFO cannot be created, including when something
    /// already exists at `path`.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        nix::unistd::mkfifo(
            &path,
            nix::sys::stat::Mode::S_IRUSR | nix::sys::stat::Mode::S_IWUSR,
        )
        .map_err(|errno| std::io::Error::from_raw_os_error(errno as i32))?;
        tracing::debug!(path = %path.display(), "created rendezvous fifo");
        Ok(Self { path })
    }

    /// Returns the FIFO path to hand to the handler's command line.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Waits for one handshake line, bounded by `deadline`.
    ///
    /// The read end is opened non-blocking, so a route misconfiguration
    /// that never produces a writer surfaces as [`SyncError::TimedOut`]
    /// instead of parking the driver forever.
    ///
    /// # Errors
    /// Fails with [`SyncError::TimedOut`] when the deadline elapses,
    /// [`SyncError::Handshake`] on a malformed or truncated line, or an
    /// I/O error from the FIFO itself.
    pub async fn await_handshake(&self, deadline: Duration) -> Result<Handshake> {
        let start = Instant::now();
        let mut fifo = std::fs::OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&self.path)?;

        let mut buf: Vec<u8> = Vec::new();
        let mut chunk = [0u8; 256];
        loop {
            match fifo.read(&mut chunk) {
                // No writer yet, unless we already saw part of a line; in
                // that case the writer closed mid-handshake.
                Ok(0) if buf.is_empty() => {}
                Ok(0) => {
                    return Err(SyncError::handshake(
                        "channel closed before the handshake line was complete",
                    ));
                }
                Ok(n) => {
                    buf.extend_from_slice(&chunk[..n]);
                    if let Some(newline) = buf.iter().position(|&b| b == b'\n') {
                        let line = String::from_utf8_lossy(&buf[..newline]).into_owned();
                        tracing::debug!(%line, elapsed = ?start.elapsed(), "handshake received");
                        return line.parse();
                    }
                }
                Err(e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }

            if start.elapsed() >= deadline {
                return Err(SyncError::timed_out("handshake", deadline));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

impl Drop for RendezvousChannel {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
