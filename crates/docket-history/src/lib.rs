// Docket versioned recording
//
// This crate records successive snapshots of externally-sourced documents as
// versions in a history-preserving store. Snapshots are written to a
// deterministic path per document, committed only when they changed, and all
// commits are serialized through a single queue so the shared store never
// sees interleaved writes.

pub mod backend;
pub mod config;
pub mod document;
pub mod logging;
pub mod mime;
pub mod path;
pub mod queue;
pub mod recorder;
pub mod types;

// Re-export the main entry points
pub use backend::{GitBackend, GitSettings, MemoryBackend, VersionBackend, VersionMatch};
pub use config::{AuthorConfig, DocketConfig, LoggingConfig, RecorderConfig};
pub use document::DocumentTypes;
pub use path::{PathPattern, PathResolver};
pub use queue::{CommitFuture, CommitQueue, CommitScheduler, CommitTask, InlineCommitter, QueueStats};
pub use recorder::{LatestRecord, Record, RecordOutcome, RecordRequest, Recorder};
pub use types::{Content, DocumentId, VersionId};

pub use docket_error::{BackendError, CommitError, ConfigError, DocketError, RecorderError, RecorderResult};
