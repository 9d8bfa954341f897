//! Marker discovery for indirectly-triggered handlers.
//!
//! A handler fired through the data path has no rendezvous channel wired
//! to it. Instead it drops a marker file, named by its handler id, into a
//! mailbox directory the harness watches. Each scenario gets its own
//! mailbox, scoped by the scenario token, so concurrent scenarios never
//! fish markers out of each other's directories.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};

use notify::{RecursiveMode, Watcher};

use encuentro_core::types::{HandlerId, ScenarioToken};

use crate::error::{Result, SyncError};

/// A scenario-scoped mailbox directory for request markers.
#[derive(Debug)]
pub struct RequestRegistry {
    dir: PathBuf,
}

impl RequestRegistry {
    /// Creates the mailbox directory `base/scenario-<token>`.
    ///
    /// # Errors
    /// Fails if the directory cannot be created.
    pub fn create(base: impl AsRef<Path>, token: &ScenarioToken) -> Result<Self> {
        let dir = base.as_ref().join(format!("scenario-{token}"));
        fs::create_dir_all(&dir)?;
        tracing::debug!(mailbox = %dir.display(), "created scenario mailbox");
        Ok(Self { dir })
    }

    /// Returns the mailbox path to hand to the handler's command line.
    #[must_use]
    pub fn mailbox(&self) -> &Path {
        &self.dir
    }

    /// Waits for a marker to arrive, consumes it, and returns its handler
    /// id, bounded by `deadline`.
    ///
    /// Arrival is detected by a filesystem watcher; the mailbox is also
    /// scanned up front (and after every event) so a marker that predates
    /// the watch registration is not missed. Exactly one marker is
    /// consumed per call. Concurrent calls on one registry are not
    /// supported; the harness is single-actor per scenario.
    ///
    /// # Errors
    /// Fails with [`SyncError::TimedOut`] when the deadline elapses, or a
    /// mailbox/watch error if the directory becomes unusable.
    pub async fn discover_marker(&self, deadline: Duration) -> Result<HandlerId> {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || discover_blocking(&dir, deadline))
            .await
            .map_err(|e| SyncError::mailbox(format!("discovery task failed: {e}")))?
    }
}

impl Drop for RequestRegistry {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.dir);
    }
}

fn discover_blocking(dir: &Path, deadline: Duration) -> Result<HandlerId> {
    let start = Instant::now();

    let (tx, rx) = std::sync::mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |event| {
        let _ = tx.send(event);
    })?;
    watcher.watch(dir, RecursiveMode::NonRecursive)?;

    loop {
        if let Some(id) = take_first_marker(dir)? {
            tracing::debug!(handler_id = %id, elapsed = ?start.elapsed(), "marker discovered");
            return Ok(id);
        }

        let Some(remaining) = deadline.checked_sub(start.elapsed()) else {
            return Err(SyncError::timed_out("request marker", deadline));
        };
        match rx.recv_timeout(remaining) {
            Ok(Ok(_event)) => {} // something changed, rescan
            Ok(Err(e)) => return Err(e.into()),
            Err(RecvTimeoutError::Timeout) => {
                return Err(SyncError::timed_out("request marker", deadline));
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(SyncError::mailbox("watcher channel closed"));
            }
        }
    }
}

/// Reads and deletes the first non-empty marker in OS listing order.
///
/// Ordering under multiple outstanding markers is not guaranteed; the
/// scenario-scoped mailbox keeps that set to at most one in practice.
///
/// A marker that exists but is still empty is left in place: the producer
/// creates the file and writes the handler id in separate steps, and the
/// watcher fires on the create. The content write lands as a later event,
/// so an empty marker means "not ready yet", not a protocol violation.
fn take_first_marker(dir: &Path) -> Result<Option<HandlerId>> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();

        let mut line = String::new();
        BufReader::new(fs::File::open(&path)?).read_line(&mut line)?;
        let id = line.trim();
        if id.is_empty() {
            continue;
        }
        let id = HandlerId::new(id);

        // Consuming the marker is what makes discovery idempotent per
        // request.
        fs::remove_file(&path)?;
        return Ok(Some(id));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_marker(registry: &RequestRegistry, id: &str) {
        fs::write(registry.mailbox().join(id), format!("{id}\n")).unwrap();
    }

    fn marker_count(registry: &RequestRegistry) -> usize {
        fs::read_dir(registry.mailbox()).unwrap().count()
    }

    #[tokio::test]
    async fn test_discovers_preexisting_marker() {
        let base = tempfile::tempdir().unwrap();
        let registry = RequestRegistry::create(base.path(), &ScenarioToken::new()).unwrap();
        write_marker(&registry, "h-17");

        let id = registry
            .discover_marker(Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(id.as_str(), "h-17");
        assert_eq!(marker_count(&registry), 0, "discovery must consume");
    }

    #[tokio::test]
    async fn test_discovers_marker_arriving_late() {
        let base = tempfile::tempdir().unwrap();
        let registry = RequestRegistry::create(base.path(), &ScenarioToken::new()).unwrap();

        let mailbox = registry.mailbox().to_path_buf();
        let producer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(150));
            fs::write(mailbox.join("h-42"), "h-42\n").unwrap();
        });

        let id = registry
            .discover_marker(Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(id.as_str(), "h-42");
        producer.join().unwrap();
    }

    #[tokio::test]
    async fn test_discovery_times_out_on_empty_mailbox() {
        let base = tempfile::tempdir().unwrap();
        let registry = RequestRegistry::create(base.path(), &ScenarioToken::new()).unwrap();

        let started = Instant::now();
        let err = registry
            .discover_marker(Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(err.is_timeout(), "got {err}");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_consumes_exactly_one_marker() {
        let base = tempfile::tempdir().unwrap();
        let registry = RequestRegistry::create(base.path(), &ScenarioToken::new()).unwrap();
        write_marker(&registry, "h-a");
        write_marker(&registry, "h-b");

        let id = registry
            .discover_marker(Duration::from_secs(5))
            .await
            .unwrap();
        assert!(matches!(id.as_str(), "h-a" | "h-b"));
        assert_eq!(marker_count(&registry), 1);
        assert!(!registry.mailbox().join(id.as_str()).exists());
    }

    #[tokio::test]
    async fn test_mailboxes_are_scoped_per_scenario() {
        let base = tempfile::tempdir().unwrap();
        let ours = RequestRegistry::create(base.path(), &ScenarioToken::new()).unwrap();
        let theirs = RequestRegistry::create(base.path(), &ScenarioToken::new()).unwrap();
        assert_ne!(ours.mailbox(), theirs.mailbox());

        write_marker(&theirs, "h-other");
        let err = ours
            .discover_marker(Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(err.is_timeout(), "foreign marker must stay invisible");
        assert_eq!(marker_count(&theirs), 1);
    }

    #[tokio::test]
    async fn test_empty_marker_is_waited_out_not_consumed() {
        let base = tempfile::tempdir().unwrap();
        let registry = RequestRegistry::create(base.path(), &ScenarioToken::new()).unwrap();
        fs::write(registry.mailbox().join("h-empty"), "").unwrap();

        let err = registry
            .discover_marker(Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(err.is_timeout(), "got {err}");
        assert_eq!(marker_count(&registry), 1, "empty marker must stay put");
    }

    #[tokio::test]
    async fn test_marker_created_empty_then_written_is_discovered() {
        let base = tempfile::tempdir().unwrap();
        let registry = RequestRegistry::create(base.path(), &ScenarioToken::new()).unwrap();

        // The producer's create and content write are separate steps; the
        // registry must ride out the window between them.
        let marker = registry.mailbox().join("h-late");
        fs::write(&marker, "").unwrap();
        let producer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            fs::write(&marker, "h-late\n").unwrap();
        });

        let id = registry
            .discover_marker(Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(id.as_str(), "h-late");
        assert_eq!(marker_count(&registry), 0);
        producer.join().unwrap();
    }

    #[test]
    fn test_drop_removes_mailbox() {
        let base = tempfile::tempdir().unwrap();
        let registry = RequestRegistry::create(base.path(), &ScenarioToken::new()).unwrap();
        let mailbox = registry.mailbox().to_path_buf();
        assert!(mailbox.is_dir());
        drop(registry);
        assert!(!mailbox.exists());
    }
}
