// Versioned document recorder
//
// Writes snapshots to their deterministic path, decides whether they changed
// and funnels every resulting commit through the commit scheduler. Lookups go
// straight to the backend.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use docket_error::{RecorderError, RecorderResult};
use tracing::{debug, info, instrument, warn};

use crate::backend::{GitBackend, VersionBackend};
use crate::config::RecorderConfig;
use crate::document::DocumentTypes;
use crate::mime;
use crate::path::PathResolver;
use crate::queue::{CommitQueue, CommitScheduler, CommitTask, QueueStats};
use crate::types::{Content, DocumentId, VersionId};

/// A snapshot to record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRequest {
    pub document: DocumentId,
    pub content: Content,
    /// Free text stored as the commit message body
    pub changelog: Option<String>,
    /// Explicit file extension, wins over `mime_type`
    pub extension: Option<String>,
    /// MIME type of `content`, used to pick the file extension
    pub mime_type: Option<String>,
}

impl RecordRequest {
    pub fn new(document: DocumentId, content: impl Into<Content>) -> Self {
        Self {
            document,
            content: content.into(),
            changelog: None,
            extension: None,
            mime_type: None,
        }
    }

    pub fn with_changelog(mut self, changelog: impl Into<String>) -> Self {
        self.changelog = Some(changelog.into());
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// What recording a snapshot did to history
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Content changed and a new version was created
    Committed(VersionId),
    /// Content is identical to the latest version; history untouched
    Unchanged,
}

/// Result of a successful `record`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Path the snapshot was written to
    pub path: PathBuf,
    pub outcome: RecordOutcome,
    /// No version had ever touched the path before this call
    pub is_first_version: bool,
}

impl Record {
    /// Version created by this call, if any
    pub fn version_id(&self) -> Option<&VersionId> {
        match &self.outcome {
            RecordOutcome::Committed(version_id) => Some(version_id),
            RecordOutcome::Unchanged => None,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self.outcome, RecordOutcome::Committed(_))
    }
}

/// Latest recorded version of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestRecord {
    pub version_id: VersionId,
    pub content: Content,
    pub mime_type: String,
}

/// Records document snapshots as versions in a backend
pub struct Recorder {
    resolver: PathResolver,
    backend: Arc<dyn VersionBackend>,
    commits: Arc<dyn CommitScheduler>,
    document_types: DocumentTypes,
}

impl Recorder {
    /// Recorder with its own commit queue.
    ///
    /// Must be called from within a tokio runtime, which runs the queue
    /// worker.
    pub fn new(resolver: PathResolver, backend: Arc<dyn VersionBackend>, document_types: DocumentTypes) -> Self {
        let commits = Arc::new(CommitQueue::new(Arc::clone(&backend)));
        Self::with_scheduler(resolver, backend, commits, document_types)
    }

    /// Recorder using the given commit scheduler
    pub fn with_scheduler(
        resolver: PathResolver,
        backend: Arc<dyn VersionBackend>,
        commits: Arc<dyn CommitScheduler>,
        document_types: DocumentTypes,
    ) -> Self {
        Self {
            resolver,
            backend,
            commits,
            document_types,
        }
    }

    /// Recorder over `backend`, laid out as described by `config`
    pub fn from_config(config: &RecorderConfig, backend: Arc<dyn VersionBackend>) -> Self {
        Self::new(
            PathResolver::new(&config.root, &config.default_extension),
            backend,
            DocumentTypes::with_overrides(&config.document_types),
        )
    }

    /// Recorder over the git repository at `config.root`, created if missing
    pub fn open(config: &RecorderConfig) -> RecorderResult<Self> {
        let backend = GitBackend::open_or_init(&config.root, config.git_settings())?;
        Ok(Self::from_config(config, Arc::new(backend)))
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn document_types(&self) -> &DocumentTypes {
        &self.document_types
    }

    /// Counters of the commit scheduler
    pub fn queue_stats(&self) -> QueueStats {
        self.commits.stats()
    }

    /// Commits enqueued but not finished yet
    pub fn pending_commits(&self) -> u64 {
        self.commits.stats().pending()
    }

    /// Write a snapshot and create a version if it differs from the last one
    #[instrument(skip_all, fields(document = %request.document))]
    pub async fn record(&self, request: RecordRequest) -> RecorderResult<Record> {
        let RecordRequest {
            document,
            content,
            changelog,
            extension,
            mime_type,
        } = request;

        document.validate().map_err(RecorderError::InvalidIdentity)?;
        let extension = self.choose_extension(extension.as_deref(), mime_type.as_deref())?;
        let path = self.resolver.resolve(&document, extension.as_deref());

        self.save(&path, &content).await?;
        debug!(path = %path.display(), bytes = content.len(), "saved snapshot");

        let is_first_version = self.backend.is_untracked(&path).await?;
        if !self.backend.has_working_tree_changes(&path).await? {
            info!(path = %path.display(), "no changes, nothing committed");
            return Ok(Record {
                path,
                outcome: RecordOutcome::Unchanged,
                is_first_version,
            });
        }

        let message = self
            .document_types
            .commit_message(&document, is_first_version, changelog.as_deref());
        let version_id = self.commits.enqueue(CommitTask::new(path.clone(), message)).await?;

        info!(
            path = %path.display(),
            version = %version_id,
            first_version = is_first_version,
            "recorded new version"
        );
        Ok(Record {
            path,
            outcome: RecordOutcome::Committed(version_id),
            is_first_version,
        })
    }

    /// Latest version of `document` with its content, `None` if it was never
    /// recorded
    #[instrument(skip_all, fields(document = %document))]
    pub async fn latest_record(&self, document: &DocumentId) -> RecorderResult<Option<LatestRecord>> {
        document.validate().map_err(RecorderError::InvalidIdentity)?;
        let pattern = self.resolver.pattern(document)?;

        let Some(found) = self.backend.find_latest_version(&pattern).await? else {
            debug!(pattern = pattern.as_str(), "no recorded version");
            return Ok(None);
        };

        let mime_type = mime::mime_type_for(&found.path);
        let bytes = tokio::fs::read(&found.path).await.map_err(|source| RecorderError::Read {
            path: found.path.clone(),
            source,
        })?;
        let content = if mime::is_textual(mime_type) {
            match String::from_utf8(bytes) {
                Ok(text) => Content::Text(text),
                Err(e) => Content::Binary(e.into_bytes()),
            }
        } else {
            Content::Binary(bytes)
        };

        Ok(Some(LatestRecord {
            version_id: found.version_id,
            content,
            mime_type: mime_type.to_string(),
        }))
    }

    /// Whether any version of `document` was ever recorded, under any extension
    pub async fn is_tracked(&self, document: &DocumentId) -> RecorderResult<bool> {
        document.validate().map_err(RecorderError::InvalidIdentity)?;
        let pattern = self.resolver.pattern(document)?;
        Ok(self.backend.is_path_ever_tracked(&pattern).await?)
    }

    /// Push recorded versions to the remote.
    ///
    /// Not ordered against the commit queue: versions still pending are not
    /// part of the push.
    #[instrument(skip_all)]
    pub async fn publish(&self) -> RecorderResult<()> {
        let pending = self.pending_commits();
        if pending > 0 {
            warn!(pending, "publishing while commits are still pending");
        }
        self.backend.push_to_remote().await.map_err(RecorderError::Publish)?;
        info!("published recorded versions");
        Ok(())
    }

    /// Explicit extension, else the MIME type's, else the default (`None`)
    fn choose_extension(&self, explicit: Option<&str>, mime_type: Option<&str>) -> RecorderResult<Option<String>> {
        if let Some(extension) = explicit {
            let extension = extension.strip_prefix('.').unwrap_or(extension);
            if extension.is_empty() || extension.contains(['.', '/', '\\']) {
                return Err(RecorderError::InvalidExtension(format!(
                    "'{}' must be a single bare extension",
                    extension
                )));
            }
            return Ok(Some(extension.to_string()));
        }

        match mime_type {
            Some(mime_type) => match mime::extension_for(mime_type) {
                Some(extension) => Ok(Some(extension.to_string())),
                None => {
                    debug!(mime_type, "no extension known for MIME type, using default");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    async fn save(&self, path: &Path, content: &Content) -> RecorderResult<()> {
        if let Some(directory) = path.parent() {
            tokio::fs::create_dir_all(directory)
                .await
                .map_err(|source| RecorderError::Write {
                    path: directory.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(path, content.as_bytes())
            .await
            .map_err(|source| RecorderError::Write {
                path: path.to_path_buf(),
                source,
            })
    }
}
