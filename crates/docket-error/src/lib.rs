// Docket Error Handling Framework
// Central location for error types shared by the recorder, its backends and the CLI

use std::fmt;

mod backend;
mod config;
mod recorder;

pub use backend::{BackendError, BackendResult};
pub use config::{ConfigError, ConfigResult};
pub use recorder::{CommitError, RecorderError, RecorderResult};

/// Error domains representing the components of the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorDomain {
    Backend,
    Queue,
    Recorder,
    Config,
}

impl fmt::Display for ErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorDomain::Backend => write!(f, "backend"),
            ErrorDomain::Queue => write!(f, "queue"),
            ErrorDomain::Recorder => write!(f, "recorder"),
            ErrorDomain::Config => write!(f, "config"),
        }
    }
}

/// Numeric error code, grouped by domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ErrorCode(pub u32);

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

/// Base trait for all errors raised by docket crates.
pub trait DocketError: std::error::Error + Send + Sync + 'static {
    /// Numeric code for this error
    fn code(&self) -> ErrorCode;

    /// Domain the error originates from
    fn domain(&self) -> ErrorDomain;

    /// Stable symbolic name, suitable for logs and machine-readable output
    fn error_code(&self) -> &'static str;

    /// Whether retrying the whole operation might succeed.
    fn is_transient(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_error_code_display_is_zero_padded() {
        assert_eq!(ErrorCode(12).to_string(), "0012");
        assert_eq!(ErrorCode(2001).to_string(), "2001");
    }

    #[test]
    fn test_codes_are_grouped_by_domain() {
        let backend = BackendError::NothingToCommit(PathBuf::from("acme/terms.md"));
        assert_eq!(backend.domain(), ErrorDomain::Backend);
        assert_eq!(backend.code().0 / 1000, 1);

        let config = ConfigError::Invalid("root is empty".to_string());
        assert_eq!(config.domain(), ErrorDomain::Config);
        assert_eq!(config.code().0 / 1000, 4);
    }
}
