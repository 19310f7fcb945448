//! Recorder configuration
//!
//! Configuration is read from a TOML file and then overridden by `DOCKET_*`
//! environment variables. Every field has a default, so an empty file is a
//! valid configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use docket_error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

use crate::backend::GitSettings;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocketConfig {
    /// Storage and commit settings
    pub recorder: RecorderConfig,

    /// Log output settings
    pub logging: LoggingConfig,
}

/// Storage and commit settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Working directory of the version repository
    pub root: PathBuf,

    /// Extension used when neither an explicit one nor a MIME type is given
    pub default_extension: String,

    /// Remote that `publish` pushes to
    pub remote: String,

    /// Branch to publish; the checked-out branch when unset
    pub branch: Option<String>,

    /// Identity used for commits
    pub author: AuthorConfig,

    /// Display names of document kinds, used in commit subjects
    pub document_types: BTreeMap<String, String>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./data/versions"),
            default_extension: "md".to_string(),
            remote: "origin".to_string(),
            branch: None,
            author: AuthorConfig::default(),
            document_types: BTreeMap::new(),
        }
    }
}

impl RecorderConfig {
    /// Settings for the git backend
    pub fn git_settings(&self) -> GitSettings {
        GitSettings {
            remote: self.remote.clone(),
            branch: self.branch.clone(),
            author_name: self.author.name.clone(),
            author_email: self.author.email.clone(),
        }
    }
}

/// Commit author identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorConfig {
    pub name: String,
    pub email: String,
}

impl Default for AuthorConfig {
    fn default() -> Self {
        Self {
            name: "docket".to_string(),
            email: "docket@localhost".to_string(),
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "docket_history=debug,info"
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl DocketConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read configuration from a TOML file
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Load from `path` when given (defaults otherwise), apply the process
    /// environment and validate
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `DOCKET_*` overrides, looked up through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup("DOCKET_ROOT") {
            self.recorder.root = PathBuf::from(root);
        }
        if let Some(extension) = lookup("DOCKET_DEFAULT_EXTENSION") {
            self.recorder.default_extension = extension;
        }
        if let Some(remote) = lookup("DOCKET_REMOTE") {
            self.recorder.remote = remote;
        }
        if let Some(branch) = lookup("DOCKET_BRANCH") {
            self.recorder.branch = Some(branch).filter(|b| !b.is_empty());
        }
        if let Some(name) = lookup("DOCKET_AUTHOR_NAME") {
            self.recorder.author.name = name;
        }
        if let Some(email) = lookup("DOCKET_AUTHOR_EMAIL") {
            self.recorder.author.email = email;
        }
        if let Some(level) = lookup("DOCKET_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = lookup("DOCKET_LOG_JSON") {
            self.logging.json = parse_bool("DOCKET_LOG_JSON", &json)?;
        }
        Ok(())
    }

    /// Reject values the recorder cannot work with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.recorder.root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("recorder.root must not be empty".to_string()));
        }
        let extension = &self.recorder.default_extension;
        if extension.is_empty() || extension.contains('.') || extension.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "recorder.default_extension '{}' must be a bare extension such as 'md'",
                extension
            )));
        }
        if self.recorder.remote.is_empty() {
            return Err(ConfigError::Invalid("recorder.remote must not be empty".to_string()));
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::Invalid(format!("{} must be a boolean, got '{}'", key, other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = DocketConfig::from_toml_str("").unwrap();
        assert_eq!(config, DocketConfig::default());
        assert_eq!(config.recorder.default_extension, "md");
        assert_eq!(config.recorder.remote, "origin");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_full_file() {
        let text = r#"
            [recorder]
            root = "/srv/versions"
            default_extension = "txt"
            remote = "publish"
            branch = "main"

            [recorder.author]
            name = "Archive Bot"
            email = "bot@example.org"

            [recorder.document_types]
            "privacy-policy" = "Privacy Notice"

            [logging]
            level = "debug"
            json = true
        "#;

        let config = DocketConfig::from_toml_str(text).unwrap();
        assert_eq!(config.recorder.root, PathBuf::from("/srv/versions"));
        assert_eq!(config.recorder.default_extension, "txt");
        assert_eq!(config.recorder.branch.as_deref(), Some("main"));
        assert_eq!(config.recorder.author.name, "Archive Bot");
        assert_eq!(config.recorder.document_types["privacy-policy"], "Privacy Notice");
        assert!(config.logging.json);

        let settings = config.recorder.git_settings();
        assert_eq!(settings.remote, "publish");
        assert_eq!(settings.author_email, "bot@example.org");
    }

    #[test]
    fn test_unknown_types_are_parse_errors() {
        let err = DocketConfig::from_toml_str("[logging]\njson = \"maybe\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("DOCKET_ROOT", "/tmp/elsewhere"),
            ("DOCKET_BRANCH", "archive"),
            ("DOCKET_LOG_JSON", "yes"),
        ]
        .into_iter()
        .collect();

        let mut config = DocketConfig::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(config.recorder.root, PathBuf::from("/tmp/elsewhere"));
        assert_eq!(config.recorder.branch.as_deref(), Some("archive"));
        assert!(config.logging.json);
        assert_eq!(config.recorder.remote, "origin");
    }

    #[test]
    fn test_invalid_env_boolean() {
        let mut config = DocketConfig::default();
        let err = config
            .apply_env(|key| (key == "DOCKET_LOG_JSON").then(|| "sometimes".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_validate_rejects_dotted_extension() {
        let mut config = DocketConfig::default();
        assert!(config.validate().is_ok());

        config.recorder.default_extension = ".md".to_string();
        assert!(config.validate().is_err());

        config.recorder.default_extension = "md".to_string();
        config.recorder.root = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = DocketConfig::from_file(Path::new("/nonexistent/docket.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
