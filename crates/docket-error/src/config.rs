// Configuration error types

use thiserror::Error;

use crate::{DocketError, ErrorCode, ErrorDomain};

/// Configuration error codes
pub mod codes {
    use crate::ErrorCode;

    // Config error codes start with 4000
    pub const IO_ERROR: ErrorCode = ErrorCode(4001);
    pub const PARSE_ERROR: ErrorCode = ErrorCode(4002);
    pub const INVALID: ErrorCode = ErrorCode(4003);
}

/// Errors raised while loading or validating configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Could not read config file: {0}")]
    Io(String),

    /// Config file is not valid TOML for the expected schema
    #[error("Could not parse config: {0}")]
    Parse(String),

    /// Values parsed but are not usable
    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl DocketError for ConfigError {
    fn code(&self) -> ErrorCode {
        use codes::*;
        match self {
            ConfigError::Io(_) => IO_ERROR,
            ConfigError::Parse(_) => PARSE_ERROR,
            ConfigError::Invalid(_) => INVALID,
        }
    }

    fn domain(&self) -> ErrorDomain {
        ErrorDomain::Config
    }

    fn error_code(&self) -> &'static str {
        match self {
            ConfigError::Io(_) => "CONFIG_IO",
            ConfigError::Parse(_) => "CONFIG_PARSE",
            ConfigError::Invalid(_) => "CONFIG_INVALID",
        }
    }
}

/// Convenient Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;
