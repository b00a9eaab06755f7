//! Polling filesystem observer.
//!
//! A background task rescans the watch root every `scan_interval`. A path that
//! was not in the previous scan is a create event, a path whose `(mtime, len)`
//! changed is a modify event. Each event's file is read in full and searched
//! for the target identifier (case-insensitive). The first hit is published
//! once and the task exits; later writes are ignored.
//!
//! The baseline snapshot is taken before `start` returns, so any write made
//! after `start` is seen. The event timestamp is taken when the match is
//! detected and trails the real write by at most one scan interval plus the
//! time to read the file.
//!
//! State machine: `Watching -> Matched` or `Watching -> Stopped`, both
//! terminal. Transitions happen under one lock, so a match racing with `stop`
//! resolves to exactly one of the two.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::Utc;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tlm_core::{ObservationEvent, TargetIdentifier};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{WatchError, WatchResult};

/// Default rescan period.
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone)]
pub struct ObserverConfig {
    /// Directory watched recursively. Created if missing.
    pub root: PathBuf,
    pub scan_interval: Duration,
}

impl ObserverConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            scan_interval: DEFAULT_SCAN_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_scan_interval(mut self, scan_interval: Duration) -> Self {
        self.scan_interval = scan_interval;
        self
    }
}

/// Observer lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverState {
    Watching,
    /// Terminal: a matching event was recorded.
    Matched,
    /// Terminal: stopped without a match.
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
}

#[derive(Debug, Clone)]
struct Change {
    path: PathBuf,
    kind: ChangeKind,
    modified: Option<SystemTime>,
}

// ============================================================================
// Scanner
// ============================================================================

/// Blocking scan state, moved in and out of `spawn_blocking`.
struct Scanner {
    root: PathBuf,
    target: TargetIdentifier,
    seen: HashMap<PathBuf, FileStamp>,
}

impl Scanner {
    /// Create the root if needed and take the baseline snapshot.
    fn new(root: PathBuf, target: TargetIdentifier) -> WatchResult<Self> {
        let setup_err = |source| WatchError::Setup {
            path: root.clone(),
            source,
        };
        std::fs::create_dir_all(&root).map_err(setup_err)?;
        // Fail here on an unreadable root rather than silently seeing nothing.
        std::fs::read_dir(&root).map_err(setup_err)?;

        let seen = snapshot(&root);
        debug!(root = %root.display(), files = seen.len(), "Observer baseline taken");
        Ok(Self { root, target, seen })
    }

    /// Diff the tree against the previous scan, oldest write first.
    fn changes(&mut self) -> Vec<Change> {
        let current = snapshot(&self.root);
        let mut changes: Vec<Change> = current
            .iter()
            .filter_map(|(path, stamp)| {
                let kind = match self.seen.get(path) {
                    None => ChangeKind::Created,
                    Some(previous) if previous != stamp => ChangeKind::Modified,
                    Some(_) => return None,
                };
                Some(Change {
                    path: path.clone(),
                    kind,
                    modified: stamp.modified,
                })
            })
            .collect();
        self.seen = current;

        changes.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));
        changes
    }

    /// One scan. Returns the first change whose content contains the target.
    fn scan(&mut self) -> Option<ObservationEvent> {
        for change in self.changes() {
            let content = match std::fs::read(&change.path) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    // Deleted or rotated between scan and read
                    debug!(path = %change.path.display(), error = %e, "Skipping unreadable file");
                    continue;
                }
            };

            if self.target.is_contained_in(&content) {
                let timestamp = Utc::now();
                debug!(path = %change.path.display(), kind = ?change.kind, "Target found");
                return Some(ObservationEvent {
                    timestamp,
                    file_path: change.path,
                    matched_content: content,
                });
            }
        }
        None
    }
}

/// `(mtime, len)` of every regular file under `root`.
fn snapshot(root: &Path) -> HashMap<PathBuf, FileStamp> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let metadata = entry.metadata().ok()?;
            Some((
                entry.into_path(),
                FileStamp {
                    modified: metadata.modified().ok(),
                    len: metadata.len(),
                },
            ))
        })
        .collect()
}

// ============================================================================
// Shared match cell
// ============================================================================

struct Shared {
    matched: OnceCell<ObservationEvent>,
    state: Mutex<ObserverState>,
    token: CancellationToken,
}

impl Shared {
    /// Record the match unless already terminal.
    fn publish(&self, event: ObservationEvent) -> bool {
        let mut state = self.state.lock();
        if *state != ObserverState::Watching || self.matched.set(event).is_err() {
            return false;
        }
        *state = ObserverState::Matched;
        true
    }

    /// Returns true on the first call that ends a watch without a match.
    fn stop(&self) -> bool {
        let mut state = self.state.lock();
        self.token.cancel();
        if *state == ObserverState::Watching {
            *state = ObserverState::Stopped;
            true
        } else {
            false
        }
    }
}

// ============================================================================
// FileSystemObserver / WatchHandle
// ============================================================================

/// Starts watches on a directory tree.
#[derive(Debug, Clone)]
pub struct FileSystemObserver {
    config: ObserverConfig,
}

impl FileSystemObserver {
    pub fn new(config: ObserverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ObserverConfig {
        &self.config
    }

    /// Begin watching for `target`.
    ///
    /// # Errors
    /// `WatchError::Setup` if the root cannot be created or read.
    pub async fn start(&self, target: TargetIdentifier) -> WatchResult<WatchHandle> {
        let root = self.config.root.clone();
        let scanner = tokio::task::spawn_blocking(move || Scanner::new(root, target))
            .await
            .map_err(|e| WatchError::Task(e.to_string()))??;

        let shared = Arc::new(Shared {
            matched: OnceCell::new(),
            state: Mutex::new(ObserverState::Watching),
            token: CancellationToken::new(),
        });

        let task = tokio::spawn(scan_loop(
            scanner,
            shared.clone(),
            self.config.scan_interval,
        ));

        info!(
            root = %self.config.root.display(),
            scan_interval_ms = self.config.scan_interval.as_millis() as u64,
            "Observer started"
        );

        Ok(WatchHandle {
            shared,
            task: Mutex::new(Some(task)),
            root: self.config.root.clone(),
        })
    }
}

async fn scan_loop(mut scanner: Scanner, shared: Arc<Shared>, interval: Duration) {
    loop {
        tokio::select! {
            biased;
            () = shared.token.cancelled() => break,
            () = tokio::time::sleep(interval) => {}
        }

        let result = tokio::task::spawn_blocking(move || {
            let event = scanner.scan();
            (scanner, event)
        })
        .await;

        let (returned, event) = match result {
            Ok(scanned) => scanned,
            Err(e) => {
                warn!(error = %e, "Scan task failed, observer exiting");
                break;
            }
        };
        scanner = returned;

        if let Some(event) = event {
            let path = event.file_path.clone();
            if shared.publish(event) {
                info!(path = %path.display(), "Target identifier observed");
            }
            break;
        }
    }
    debug!("Observer scan loop exited");
}

/// Handle to a running watch.
///
/// Dropping the handle cancels the background task.
pub struct WatchHandle {
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
    root: PathBuf,
}

impl WatchHandle {
    pub fn state(&self) -> ObserverState {
        *self.shared.state.lock()
    }

    /// The first matching event, once published.
    pub fn matched(&self) -> Option<&ObservationEvent> {
        self.shared.matched.get()
    }

    pub fn is_matched(&self) -> bool {
        self.shared.matched.get().is_some()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stop watching. Safe to call any number of times.
    pub fn stop(&self) {
        if self.shared.stop() {
            info!(root = %self.root.display(), "Observer stopped without match");
        }
    }

    /// Stop and wait for the background task to exit.
    pub async fn shutdown(&self) {
        self.stop();
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "Observer task ended abnormally");
            }
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.shared.token.cancel();
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("root", &self.root)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const TARGET: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    fn target() -> TargetIdentifier {
        TargetIdentifier::new(TARGET).unwrap()
    }

    fn observer(dir: &Path) -> FileSystemObserver {
        FileSystemObserver::new(
            ObserverConfig::new(dir).with_scan_interval(Duration::from_millis(10)),
        )
    }

    async fn wait_for_match(handle: &WatchHandle, limit: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + limit;
        while tokio::time::Instant::now() < deadline {
            if handle.is_matched() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.is_matched()
    }

    #[tokio::test]
    async fn test_detects_new_file_in_subdirectory() {
        let dir = TempDir::new().unwrap();
        let handle = observer(dir.path()).start(target()).await.unwrap();
        assert_eq!(handle.state(), ObserverState::Watching);

        let nested = dir.path().join("node_fills").join("20240101");
        fs::create_dir_all(&nested).unwrap();
        let file = nested.join("9");
        // Mixed case must still match
        fs::write(&file, format!("{{\"user\":\"{}\"}}\n", TARGET.to_uppercase())).unwrap();

        assert!(wait_for_match(&handle, Duration::from_secs(2)).await);
        let event = handle.matched().unwrap();
        assert_eq!(event.file_path, file);
        assert!(event.matched_content.contains("\"user\""));
        assert_eq!(handle.state(), ObserverState::Matched);

        handle.stop();
        assert_eq!(handle.state(), ObserverState::Matched);
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        let dir = TempDir::new().unwrap();
        let handle = observer(dir.path()).start(target()).await.unwrap();

        let first = dir.path().join("first.log");
        fs::write(&first, TARGET).unwrap();
        assert!(wait_for_match(&handle, Duration::from_secs(2)).await);

        fs::write(dir.path().join("second.log"), TARGET).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(handle.matched().unwrap().file_path, first);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_existing_file_matches_only_after_modify() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("trades");
        fs::write(&file, format!("old {TARGET}\n")).unwrap();

        let handle = observer(dir.path()).start(target()).await.unwrap();
        assert!(!wait_for_match(&handle, Duration::from_millis(150)).await);

        fs::write(&file, format!("old {TARGET}\nnew {TARGET}\n")).unwrap();
        assert!(wait_for_match(&handle, Duration::from_secs(2)).await);
        assert_eq!(handle.matched().unwrap().file_path, file);
    }

    #[tokio::test]
    async fn test_non_matching_writes_are_ignored() {
        let dir = TempDir::new().unwrap();
        let handle = observer(dir.path()).start(target()).await.unwrap();

        fs::write(dir.path().join("other"), "0x0000000000000000000000000000000000000000").unwrap();
        assert!(!wait_for_match(&handle, Duration::from_millis(150)).await);
        assert_eq!(handle.state(), ObserverState::Watching);

        handle.stop();
        handle.stop();
        assert_eq!(handle.state(), ObserverState::Stopped);
        handle.shutdown().await;
        assert_eq!(handle.state(), ObserverState::Stopped);
    }

    #[tokio::test]
    async fn test_no_match_after_stop() {
        let dir = TempDir::new().unwrap();
        let handle = observer(dir.path()).start(target()).await.unwrap();
        handle.shutdown().await;

        fs::write(dir.path().join("late"), TARGET).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(handle.matched().is_none());
        assert_eq!(handle.state(), ObserverState::Stopped);
    }

    #[tokio::test]
    async fn test_creates_missing_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("hl").join("data");
        let handle = observer(&root).start(target()).await.unwrap();
        assert!(root.is_dir());
        assert_eq!(handle.root(), root.as_path());
    }

    #[test]
    fn test_setup_fails_when_root_is_a_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not_a_dir");
        fs::write(&file, "x").unwrap();

        let result = tokio_test::block_on(observer(&file.join("sub")).start(target()));
        assert!(matches!(result, Err(WatchError::Setup { .. })));
    }

    #[test]
    fn test_changes_sorted_by_mtime() {
        let dir = TempDir::new().unwrap();
        let mut scanner = Scanner::new(dir.path().to_path_buf(), target()).unwrap();

        let b = dir.path().join("b");
        fs::write(&b, "b").unwrap();
        std::thread::sleep(Duration::from_millis(20));
        let a = dir.path().join("a");
        fs::write(&a, "a").unwrap();

        let changes = scanner.changes();
        let paths: Vec<_> = changes.iter().map(|c| c.path.clone()).collect();
        assert_eq!(paths, vec![b.clone(), a]);
        assert!(changes.iter().all(|c| c.kind == ChangeKind::Created));

        fs::write(&b, "bb").unwrap();
        let changes = scanner.changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, b);
        assert_eq!(changes[0].kind, ChangeKind::Modified);
    }
}
