// Git implementation
//
// This module provides a libgit2-backed implementation of the VersionBackend
// trait. Commit hashes are surfaced as opaque version ids. libgit2 calls are
// blocking, so every operation runs on the blocking pool while holding the
// repository lock.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use docket_error::{BackendError, BackendResult};
use git2::{Commit, Delta, ErrorCode, Index, Oid, PushOptions, RemoteCallbacks, Repository, Signature, Sort, Status};
use tracing::{debug, info, warn};

use super::{VersionBackend, VersionMatch};
use crate::path::PathPattern;
use crate::types::VersionId;

/// Settings used when committing and publishing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSettings {
    /// Name of the remote `push_to_remote` publishes to
    pub remote: String,
    /// Branch to publish; the checked-out branch when `None`
    pub branch: Option<String>,
    /// Author and committer name
    pub author_name: String,
    /// Author and committer email
    pub author_email: String,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            branch: None,
            author_name: "docket".to_string(),
            author_email: "docket@localhost".to_string(),
        }
    }
}

/// libgit2-backed version backend
#[derive(Clone)]
pub struct GitBackend {
    inner: Arc<GitInner>,
}

struct GitInner {
    /// The repository, shared by every operation
    repo: Mutex<Repository>,
    /// Working directory documents are recorded under
    root: PathBuf,
    settings: GitSettings,
}

impl GitBackend {
    /// Open the repository whose working directory is `root`
    pub fn open(root: impl Into<PathBuf>, settings: GitSettings) -> BackendResult<Self> {
        let root = root.into();
        let repo = Repository::open(&root).map_err(git_error)?;
        Self::from_repository(repo, root, settings)
    }

    /// Open the repository at `root`, creating directory and repository if
    /// they do not exist yet
    pub fn open_or_init(root: impl Into<PathBuf>, settings: GitSettings) -> BackendResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|e| BackendError::Io(format!("could not create {}: {}", root.display(), e)))?;

        let repo = match Repository::open(&root) {
            Ok(repo) => repo,
            Err(e) if e.code() == ErrorCode::NotFound => {
                info!(root = %root.display(), "initializing version repository");
                Repository::init(&root).map_err(git_error)?
            }
            Err(e) => return Err(git_error(e)),
        };
        Self::from_repository(repo, root, settings)
    }

    fn from_repository(repo: Repository, root: PathBuf, settings: GitSettings) -> BackendResult<Self> {
        if repo.is_bare() {
            return Err(BackendError::Git(format!(
                "repository at {} is bare and has no working tree",
                root.display()
            )));
        }
        Ok(Self {
            inner: Arc::new(GitInner {
                repo: Mutex::new(repo),
                root,
                settings,
            }),
        })
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    pub fn settings(&self) -> &GitSettings {
        &self.inner.settings
    }

    /// Register a remote, replacing its URL if it already exists
    pub async fn set_remote(&self, name: &str, url: &str) -> BackendResult<()> {
        let (name, url) = (name.to_string(), url.to_string());
        self.run("set_remote", move |_, repo| {
            match repo.find_remote(&name) {
                Ok(_) => repo.remote_set_url(&name, &url).map_err(git_error),
                Err(e) if e.code() == ErrorCode::NotFound => repo.remote(&name, &url).map(|_| ()).map_err(git_error),
                Err(e) => Err(git_error(e)),
            }
        })
        .await
    }

    /// Run a blocking repository operation on the blocking pool
    async fn run<T, F>(&self, operation: &'static str, f: F) -> BackendResult<T>
    where
        F: FnOnce(&GitInner, &Repository) -> BackendResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let repo = inner.lock()?;
            f(&*inner, &*repo)
        })
        .await
        .map_err(|e| BackendError::Internal(format!("{} did not complete: {}", operation, e)))?
    }
}

impl GitInner {
    fn lock(&self) -> BackendResult<MutexGuard<'_, Repository>> {
        self.repo
            .lock()
            .map_err(|_| BackendError::Internal("repository lock poisoned".to_string()))
    }

    /// Path relative to the working directory, as libgit2 expects it
    fn relative(&self, path: &Path) -> BackendResult<PathBuf> {
        path.strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .map_err(|_| BackendError::OutsideRoot(path.to_path_buf()))
    }

    fn latest_matching(&self, repo: &Repository, pattern: &PathPattern) -> BackendResult<Option<VersionMatch>> {
        if head_commit(repo)?.is_none() {
            return Ok(None);
        }

        let mut walk = repo.revwalk().map_err(git_error)?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME).map_err(git_error)?;
        walk.push_head().map_err(git_error)?;

        for oid in walk {
            let oid = oid.map_err(git_error)?;
            let commit = repo.find_commit(oid).map_err(git_error)?;
            if let Some(path) = self.touched_path(repo, &commit, pattern)? {
                return Ok(Some(VersionMatch {
                    version_id: VersionId::new(oid.to_string()),
                    path,
                }));
            }
        }
        Ok(None)
    }

    /// First path added or modified by `commit` that matches `pattern`
    fn touched_path(&self, repo: &Repository, commit: &Commit<'_>, pattern: &PathPattern) -> BackendResult<Option<PathBuf>> {
        let tree = commit.tree().map_err(git_error)?;
        let parent_tree = if commit.parent_count() > 0 {
            Some(commit.parent(0).and_then(|parent| parent.tree()).map_err(git_error)?)
        } else {
            None
        };

        let diff = repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
            .map_err(git_error)?;

        for delta in diff.deltas() {
            if delta.status() == Delta::Deleted {
                continue;
            }
            if let Some(relative) = delta.new_file().path() {
                let candidate = self.root.join(relative);
                if pattern.matches(&candidate) {
                    return Ok(Some(candidate));
                }
            }
        }
        Ok(None)
    }

    /// Commit `relative` on top of HEAD using only the in-memory index.
    ///
    /// The index is rebuilt from HEAD's tree first, so entries left behind by
    /// an earlier failed commit never end up in this one.
    fn commit_path(&self, repo: &Repository, index: &mut Index, relative: &Path, message: &str) -> BackendResult<Oid> {
        let parent = head_commit(repo)?;
        match &parent {
            Some(parent) => {
                let tree = parent.tree().map_err(git_error)?;
                index.read_tree(&tree).map_err(git_error)?;
            }
            None => index.clear().map_err(git_error)?,
        }
        index.add_path(relative).map_err(git_error)?;
        let tree_id = index.write_tree().map_err(git_error)?;

        if let Some(parent) = &parent {
            if parent.tree_id() == tree_id {
                return Err(BackendError::NothingToCommit(relative.to_path_buf()));
            }
        }

        let tree = repo.find_tree(tree_id).map_err(git_error)?;
        let signature = Signature::now(&self.settings.author_name, &self.settings.author_email).map_err(git_error)?;
        let parents: Vec<&Commit<'_>> = parent.iter().collect();
        repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .map_err(git_error)
    }

    fn branch_name(&self, repo: &Repository) -> BackendResult<String> {
        if let Some(branch) = &self.settings.branch {
            return Ok(branch.clone());
        }
        let head = repo.head().map_err(git_error)?;
        if !head.is_branch() {
            return Err(BackendError::Git("HEAD is not on a branch; configure one to publish".to_string()));
        }
        head.shorthand()
            .map(str::to_string)
            .ok_or_else(|| BackendError::Git("branch name is not valid UTF-8".to_string()))
    }
}

#[async_trait]
impl VersionBackend for GitBackend {
    async fn has_working_tree_changes(&self, path: &Path) -> BackendResult<bool> {
        let path = path.to_path_buf();
        self.run("has_working_tree_changes", move |inner, repo| {
            let relative = inner.relative(&path)?;
            match repo.status_file(&relative) {
                Ok(status) => Ok(status.intersects(changed_mask())),
                // Neither on disk nor in the index
                Err(e) if e.code() == ErrorCode::NotFound => Ok(false),
                Err(e) => Err(git_error(e)),
            }
        })
        .await
    }

    async fn is_untracked(&self, path: &Path) -> BackendResult<bool> {
        let path = path.to_path_buf();
        self.run("is_untracked", move |inner, repo| {
            let relative = inner.relative(&path)?;
            let Some(head) = head_commit(repo)? else {
                return Ok(true);
            };
            if head.tree().map_err(git_error)?.get_path(&relative).is_ok() {
                return Ok(false);
            }
            let pattern = PathPattern::exact(&path)?;
            Ok(inner.latest_matching(repo, &pattern)?.is_none())
        })
        .await
    }

    async fn stage_and_commit(&self, path: &Path, message: &str) -> BackendResult<VersionId> {
        let path = path.to_path_buf();
        let message = message.to_string();
        self.run("stage_and_commit", move |inner, repo| {
            let relative = inner.relative(&path)?;
            let mut index = repo.index().map_err(git_error)?;

            // The on-disk index only changes once the commit exists
            match inner.commit_path(repo, &mut index, &relative, &message) {
                Ok(oid) => {
                    if let Err(e) = index.write() {
                        warn!(path = %relative.display(), error = %e, "could not write index after commit");
                    }
                    debug!(path = %relative.display(), commit = %oid, "created commit");
                    Ok(VersionId::new(oid.to_string()))
                }
                Err(e) => {
                    if let Err(reload) = index.read(true) {
                        warn!(error = %reload, "could not reload index after failed commit");
                    }
                    Err(match e {
                        BackendError::NothingToCommit(_) => BackendError::NothingToCommit(path),
                        other => other,
                    })
                }
            }
        })
        .await
    }

    async fn find_latest_version(&self, pattern: &PathPattern) -> BackendResult<Option<VersionMatch>> {
        let pattern = pattern.clone();
        self.run("find_latest_version", move |inner, repo| inner.latest_matching(repo, &pattern))
            .await
    }

    async fn push_to_remote(&self) -> BackendResult<()> {
        self.run("push_to_remote", move |inner, repo| {
            let remote_name = &inner.settings.remote;
            let mut remote = repo.find_remote(remote_name).map_err(|e| {
                BackendError::Remote(format!("remote '{}' is not available: {}", remote_name, e.message()))
            })?;
            let branch = inner.branch_name(repo)?;
            let refspec = format!("refs/heads/{0}:refs/heads/{0}", branch);

            let mut rejection: Option<String> = None;
            {
                let mut callbacks = RemoteCallbacks::new();
                callbacks.push_update_reference(|refname, status| {
                    if let Some(message) = status {
                        rejection = Some(format!("{}: {}", refname, message));
                    }
                    Ok(())
                });
                let mut options = PushOptions::new();
                options.remote_callbacks(callbacks);

                remote
                    .push(&[refspec.as_str()], Some(&mut options))
                    .map_err(push_error)?;
            }

            if let Some(reason) = rejection {
                return Err(BackendError::Rejected(reason));
            }
            info!(remote = %remote_name, branch = %branch, "pushed versions to remote");
            Ok(())
        })
        .await
    }
}

/// Status bits meaning the working tree or index differs from HEAD.
///
/// An ignored path has never been committed, so it counts as new.
fn changed_mask() -> Status {
    Status::INDEX_NEW
        | Status::INDEX_MODIFIED
        | Status::INDEX_DELETED
        | Status::INDEX_RENAMED
        | Status::INDEX_TYPECHANGE
        | Status::WT_NEW
        | Status::WT_MODIFIED
        | Status::WT_DELETED
        | Status::WT_TYPECHANGE
        | Status::WT_RENAMED
        | Status::IGNORED
}

fn head_commit(repo: &Repository) -> BackendResult<Option<Commit<'_>>> {
    match repo.head() {
        Ok(reference) => reference.peel_to_commit().map(Some).map_err(git_error),
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => Ok(None),
        Err(e) => Err(git_error(e)),
    }
}

fn git_error(error: git2::Error) -> BackendError {
    BackendError::Git(error.message().to_string())
}

fn push_error(error: git2::Error) -> BackendError {
    match error.code() {
        ErrorCode::NotFastForward => BackendError::Rejected(error.message().to_string()),
        _ => BackendError::Remote(error.message().to_string()),
    }
}
