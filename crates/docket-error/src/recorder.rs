// Recorder and commit-queue error types

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::{BackendError, DocketError, ErrorCode, ErrorDomain};

/// Recorder error codes
pub mod codes {
    use crate::ErrorCode;

    // Queue error codes start with 2000
    pub const COMMIT_FAILED: ErrorCode = ErrorCode(2001);

    // Recorder error codes start with 3000
    pub const WRITE_FAILED: ErrorCode = ErrorCode(3001);
    pub const READ_FAILED: ErrorCode = ErrorCode(3002);
    pub const BACKEND_FAILED: ErrorCode = ErrorCode(3003);
    pub const PUBLISH_FAILED: ErrorCode = ErrorCode(3004);
    pub const INVALID_IDENTITY: ErrorCode = ErrorCode(3005);
    pub const INVALID_EXTENSION: ErrorCode = ErrorCode(3006);
}

/// A commit task that did not produce a version.
///
/// Carries the offending path and message so the caller can tell which
/// document failed without keeping its own bookkeeping.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Could not commit {} with message \"{message}\" due to error: \"{cause}\"", .path.display())]
pub struct CommitError {
    /// Path the task tried to commit
    pub path: PathBuf,
    /// Full commit message of the task
    pub message: String,
    /// Underlying backend failure
    #[source]
    pub cause: BackendError,
}

impl CommitError {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, cause: BackendError) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            cause,
        }
    }
}

impl DocketError for CommitError {
    fn code(&self) -> ErrorCode {
        codes::COMMIT_FAILED
    }

    fn domain(&self) -> ErrorDomain {
        ErrorDomain::Queue
    }

    fn error_code(&self) -> &'static str {
        "QUEUE_COMMIT_FAILED"
    }
}

/// Errors surfaced by recorder operations
#[derive(Error, Debug)]
pub enum RecorderError {
    /// Content or its containing directory could not be written
    #[error("Could not write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Latest recorded content could not be read back
    #[error("Could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Backend failed while detecting changes or looking up history
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Commit task failed
    #[error(transparent)]
    Commit(#[from] CommitError),

    /// Push to the remote failed
    #[error("Could not publish: {0}")]
    Publish(#[source] BackendError),

    /// Collection or document kind cannot be mapped to a path
    #[error("Invalid document identity: {0}")]
    InvalidIdentity(String),

    /// Requested file extension is not a single bare extension
    #[error("Invalid file extension: {0}")]
    InvalidExtension(String),
}

impl DocketError for RecorderError {
    fn code(&self) -> ErrorCode {
        use codes::*;
        match self {
            RecorderError::Write { .. } => WRITE_FAILED,
            RecorderError::Read { .. } => READ_FAILED,
            RecorderError::Backend(_) => BACKEND_FAILED,
            RecorderError::Commit(_) => COMMIT_FAILED,
            RecorderError::Publish(_) => PUBLISH_FAILED,
            RecorderError::InvalidIdentity(_) => INVALID_IDENTITY,
            RecorderError::InvalidExtension(_) => INVALID_EXTENSION,
        }
    }

    fn domain(&self) -> ErrorDomain {
        match self {
            RecorderError::Commit(_) => ErrorDomain::Queue,
            RecorderError::Backend(_) | RecorderError::Publish(_) => ErrorDomain::Backend,
            _ => ErrorDomain::Recorder,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            RecorderError::Write { .. } => "RECORDER_WRITE_FAILED",
            RecorderError::Read { .. } => "RECORDER_READ_FAILED",
            RecorderError::Backend(_) => "RECORDER_BACKEND_FAILED",
            RecorderError::Commit(_) => "RECORDER_COMMIT_FAILED",
            RecorderError::Publish(_) => "RECORDER_PUBLISH_FAILED",
            RecorderError::InvalidIdentity(_) => "RECORDER_INVALID_IDENTITY",
            RecorderError::InvalidExtension(_) => "RECORDER_INVALID_EXTENSION",
        }
    }

    fn is_transient(&self) -> bool {
        match self {
            RecorderError::Publish(cause) | RecorderError::Backend(cause) => cause.is_transient(),
            _ => false,
        }
    }
}

/// Convenient Result type for recorder operations
pub type RecorderResult<T> = Result<T, RecorderError>;
