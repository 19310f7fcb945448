// Version-control backend interface
//
// The recorder never touches a history store directly. Everything it needs
// from one is expressed by the `VersionBackend` trait: working-tree change
// detection, staged commits, history lookup by path pattern and remote push.
// Two implementations are provided:
// 1. Git: libgit2-backed repository, used in production
// 2. Memory: in-memory history over the on-disk working tree, for tests

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use docket_error::BackendResult;

use crate::path::PathPattern;
use crate::types::VersionId;

/// Module containing the git implementation
pub mod git;

/// Module containing the in-memory implementation
pub mod memory;

pub use git::{GitBackend, GitSettings};
pub use memory::MemoryBackend;

/// Most recent version touching a path pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMatch {
    /// Version that last touched a matching path
    pub version_id: VersionId,
    /// Concrete path that matched, under the backend root
    pub path: PathBuf,
}

/// Capabilities the recorder needs from a history-preserving store.
///
/// Paths passed in are absolute paths under the backend's root.
#[async_trait]
pub trait VersionBackend: Send + Sync + 'static {
    /// True iff the working-tree file at `path` differs from its content at
    /// the latest version, or the path has never been committed
    async fn has_working_tree_changes(&self, path: &Path) -> BackendResult<bool>;

    /// True iff no version in history ever touched `path`
    async fn is_untracked(&self, path: &Path) -> BackendResult<bool>;

    /// Stage the working-tree content of `path` and create exactly one new
    /// version with `message`.
    ///
    /// Fails with `NothingToCommit` when staging changes nothing.
    async fn stage_and_commit(&self, path: &Path, message: &str) -> BackendResult<VersionId>;

    /// Most recent version touching any path matching `pattern`
    async fn find_latest_version(&self, pattern: &PathPattern) -> BackendResult<Option<VersionMatch>>;

    /// Whether any version ever touched a path matching `pattern`
    async fn is_path_ever_tracked(&self, pattern: &PathPattern) -> BackendResult<bool> {
        Ok(self.find_latest_version(pattern).await?.is_some())
    }

    /// Publish all local versions to the configured remote
    async fn push_to_remote(&self) -> BackendResult<()>;
}
