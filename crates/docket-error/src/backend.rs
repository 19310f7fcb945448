// Backend error types
// Raised by version-control backends (git, in-memory)

use std::path::PathBuf;

use thiserror::Error;

use crate::{DocketError, ErrorCode, ErrorDomain};

/// Backend error codes
pub mod codes {
    use crate::ErrorCode;

    // Backend error codes start with 1000
    pub const GIT_ERROR: ErrorCode = ErrorCode(1001);
    pub const IO_ERROR: ErrorCode = ErrorCode(1002);
    pub const NOTHING_TO_COMMIT: ErrorCode = ErrorCode(1003);
    pub const OUTSIDE_ROOT: ErrorCode = ErrorCode(1004);
    pub const INVALID_PATTERN: ErrorCode = ErrorCode(1005);
    pub const REMOTE_ERROR: ErrorCode = ErrorCode(1006);
    pub const REJECTED: ErrorCode = ErrorCode(1007);
    pub const UNAVAILABLE: ErrorCode = ErrorCode(1008);
    pub const INTERNAL: ErrorCode = ErrorCode(1009);
}

/// Errors produced by a version-control backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// libgit2 reported a failure
    #[error("Git error: {0}")]
    Git(String),

    /// Working tree could not be read
    #[error("IO error: {0}")]
    Io(String),

    /// Staging produced no change relative to the last version
    #[error("Nothing to commit for {}", .0.display())]
    NothingToCommit(PathBuf),

    /// Path does not live under the backend's root directory
    #[error("Path {} is outside of the repository root", .0.display())]
    OutsideRoot(PathBuf),

    /// Lookup pattern could not be compiled
    #[error("Invalid path pattern: {0}")]
    InvalidPattern(String),

    /// Remote missing or unreachable
    #[error("Remote error: {0}")]
    Remote(String),

    /// Remote or backend refused the operation
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Backend (or the queue in front of it) is no longer accepting work
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Internal invariant broken (poisoned lock, failed join)
    #[error("Internal backend error: {0}")]
    Internal(String),
}

impl DocketError for BackendError {
    fn code(&self) -> ErrorCode {
        use codes::*;
        match self {
            BackendError::Git(_) => GIT_ERROR,
            BackendError::Io(_) => IO_ERROR,
            BackendError::NothingToCommit(_) => NOTHING_TO_COMMIT,
            BackendError::OutsideRoot(_) => OUTSIDE_ROOT,
            BackendError::InvalidPattern(_) => INVALID_PATTERN,
            BackendError::Remote(_) => REMOTE_ERROR,
            BackendError::Rejected(_) => REJECTED,
            BackendError::Unavailable(_) => UNAVAILABLE,
            BackendError::Internal(_) => INTERNAL,
        }
    }

    fn domain(&self) -> ErrorDomain {
        match self {
            BackendError::Unavailable(_) => ErrorDomain::Queue,
            _ => ErrorDomain::Backend,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            BackendError::Git(_) => "BACKEND_GIT",
            BackendError::Io(_) => "BACKEND_IO",
            BackendError::NothingToCommit(_) => "BACKEND_NOTHING_TO_COMMIT",
            BackendError::OutsideRoot(_) => "BACKEND_OUTSIDE_ROOT",
            BackendError::InvalidPattern(_) => "BACKEND_INVALID_PATTERN",
            BackendError::Remote(_) => "BACKEND_REMOTE",
            BackendError::Rejected(_) => "BACKEND_REJECTED",
            BackendError::Unavailable(_) => "BACKEND_UNAVAILABLE",
            BackendError::Internal(_) => "BACKEND_INTERNAL",
        }
    }

    fn is_transient(&self) -> bool {
        matches!(self, BackendError::Remote(_) | BackendError::Io(_))
    }
}

/// Convenient Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;
