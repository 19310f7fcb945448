// In-memory implementation
//
// Keeps history in memory while the working tree stays on disk, so the
// recorder's file handling is exercised unchanged. Supports fault injection,
// artificial commit latency and concurrency accounting for tests.

use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use docket_error::{BackendError, BackendResult};
use sha2::{Digest, Sha256};

use super::{VersionBackend, VersionMatch};
use crate::path::PathPattern;
use crate::types::VersionId;

/// A version created by the in-memory backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryCommit {
    pub version_id: VersionId,
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, Default)]
struct MemoryState {
    /// Content of each path at its latest version
    committed: HashMap<PathBuf, Vec<u8>>,
    /// Linear history, oldest first
    history: Vec<MemoryCommit>,
    /// Paths whose commits are rejected
    failing: HashSet<PathBuf>,
    /// Number of history entries published
    pushed: usize,
    remote_unavailable: bool,
}

/// In-memory version backend
#[derive(Debug)]
pub struct MemoryBackend {
    root: PathBuf,
    state: Mutex<MemoryState>,
    commit_latency: Option<Duration>,
    running: AtomicUsize,
    max_running: AtomicUsize,
}

impl MemoryBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            state: Mutex::new(MemoryState::default()),
            commit_latency: None,
            running: AtomicUsize::new(0),
            max_running: AtomicUsize::new(0),
        }
    }

    /// Make every commit take at least `latency`
    pub fn with_commit_latency(mut self, latency: Duration) -> Self {
        self.commit_latency = Some(latency);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reject every subsequent commit of `path`
    pub fn fail_commits_for(&self, path: impl Into<PathBuf>) {
        if let Ok(mut state) = self.state.lock() {
            state.failing.insert(path.into());
        }
    }

    /// Accept commits of `path` again
    pub fn allow_commits_for(&self, path: &Path) {
        if let Ok(mut state) = self.state.lock() {
            state.failing.remove(path);
        }
    }

    /// Simulate an unreachable remote
    pub fn set_remote_available(&self, available: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.remote_unavailable = !available;
        }
    }

    /// History, oldest first
    pub fn history(&self) -> Vec<MemoryCommit> {
        self.state.lock().map(|state| state.history.clone()).unwrap_or_default()
    }

    /// Number of versions published by `push_to_remote`
    pub fn pushed_versions(&self) -> usize {
        self.state.lock().map(|state| state.pushed).unwrap_or_default()
    }

    /// Highest number of commits ever observed running at once
    pub fn max_concurrent_commits(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }

    fn lock(&self) -> BackendResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| BackendError::Internal("memory backend lock poisoned".to_string()))
    }

    fn check_root(&self, path: &Path) -> BackendResult<()> {
        if path.starts_with(&self.root) {
            Ok(())
        } else {
            Err(BackendError::OutsideRoot(path.to_path_buf()))
        }
    }
}

/// Working-tree content of `path`, `None` when the file does not exist
async fn read_working_tree(path: &Path) -> BackendResult<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(BackendError::Io(format!("could not read {}: {}", path.display(), e))),
    }
}

/// Version id chained on the previous one, like a commit hash
fn chain_hash(parent: Option<&VersionId>, path: &Path, content: &[u8], message: &str) -> VersionId {
    let mut hasher = Sha256::new();
    if let Some(parent) = parent {
        hasher.update(parent.as_str().as_bytes());
    }
    hasher.update([0u8]);
    hasher.update(path.to_string_lossy().as_bytes());
    hasher.update([0u8]);
    hasher.update(content);
    hasher.update([0u8]);
    hasher.update(message.as_bytes());
    VersionId::new(hex::encode(hasher.finalize()))
}

/// Tracks how many commits run concurrently
struct RunningGuard<'a> {
    running: &'a AtomicUsize,
}

impl<'a> RunningGuard<'a> {
    fn enter(running: &'a AtomicUsize, max_running: &AtomicUsize) -> Self {
        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
        max_running.fetch_max(now, Ordering::SeqCst);
        Self { running }
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.running.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl VersionBackend for MemoryBackend {
    async fn has_working_tree_changes(&self, path: &Path) -> BackendResult<bool> {
        self.check_root(path)?;
        let on_disk = read_working_tree(path).await?;
        let state = self.lock()?;
        Ok(match (on_disk, state.committed.get(path)) {
            (Some(content), Some(committed)) => &content != committed,
            (Some(_), None) => true,
            (None, Some(_)) => true,
            (None, None) => false,
        })
    }

    async fn is_untracked(&self, path: &Path) -> BackendResult<bool> {
        self.check_root(path)?;
        let state = self.lock()?;
        Ok(!state.history.iter().any(|commit| commit.path == path))
    }

    async fn stage_and_commit(&self, path: &Path, message: &str) -> BackendResult<VersionId> {
        self.check_root(path)?;
        let _running = RunningGuard::enter(&self.running, &self.max_running);

        if let Some(latency) = self.commit_latency {
            tokio::time::sleep(latency).await;
        }

        let content = read_working_tree(path)
            .await?
            .ok_or_else(|| BackendError::Io(format!("{} does not exist", path.display())))?;

        let mut state = self.lock()?;
        if state.failing.contains(path) {
            return Err(BackendError::Rejected(format!("commit of {} refused", path.display())));
        }
        if state.committed.get(path) == Some(&content) {
            return Err(BackendError::NothingToCommit(path.to_path_buf()));
        }

        let version_id = chain_hash(state.history.last().map(|c| &c.version_id), path, &content, message);
        state.committed.insert(path.to_path_buf(), content);
        state.history.push(MemoryCommit {
            version_id: version_id.clone(),
            path: path.to_path_buf(),
            message: message.to_string(),
        });
        Ok(version_id)
    }

    async fn find_latest_version(&self, pattern: &PathPattern) -> BackendResult<Option<VersionMatch>> {
        let state = self.lock()?;
        Ok(state
            .history
            .iter()
            .rev()
            .find(|commit| pattern.matches(&commit.path))
            .map(|commit| VersionMatch {
                version_id: commit.version_id.clone(),
                path: commit.path.clone(),
            }))
    }

    async fn push_to_remote(&self) -> BackendResult<()> {
        let mut state = self.lock()?;
        if state.remote_unavailable {
            return Err(BackendError::Remote("remote is unreachable".to_string()));
        }
        state.pushed = state.history.len();
        Ok(())
    }
}
