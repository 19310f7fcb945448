// Deterministic document addressing
//
// Maps a document identity to a path under the storage root, and builds the
// wildcard-extension patterns used to look documents up in history.

use std::path::{Path, PathBuf};

use docket_error::{BackendError, BackendResult};
use glob::{MatchOptions, Pattern};

use crate::types::DocumentId;

/// Glob options shared by every pattern: `*` never crosses a separator.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Resolves document identities to filesystem paths under a root directory
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    default_extension: String,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>, default_extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            default_extension: default_extension.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn default_extension(&self) -> &str {
        &self.default_extension
    }

    /// Path of `id` with a concrete extension (the default when `None`).
    ///
    /// `<root>/<kind>.<ext>` for collection-wide documents,
    /// `<root>/<collection>/<kind>.<ext>` otherwise.
    pub fn resolve(&self, id: &DocumentId, extension: Option<&str>) -> PathBuf {
        let extension = extension.unwrap_or(&self.default_extension);
        let mut path = self.stem(id);
        path.set_file_name(format!("{}.{}", id.kind(), extension));
        path
    }

    /// Pattern matching `id` stored under any extension
    pub fn pattern(&self, id: &DocumentId) -> BackendResult<PathPattern> {
        PathPattern::any_extension(&self.stem(id))
    }

    fn stem(&self, id: &DocumentId) -> PathBuf {
        match id.collection() {
            Some(collection) => self.root.join(collection).join(id.kind()),
            None => self.root.join(id.kind()),
        }
    }
}

/// A glob over document paths.
///
/// Patterns built for an identity also pin the file stem, so `terms.*` does
/// not match `terms.v2.md` which belongs to the `terms.v2` kind.
#[derive(Debug, Clone)]
pub struct PathPattern {
    glob: Pattern,
    stem: Option<String>,
}

impl PathPattern {
    /// Compile a raw glob
    pub fn new(pattern: &str) -> BackendResult<Self> {
        let glob = Pattern::new(pattern)
            .map_err(|e| BackendError::InvalidPattern(format!("{}: {}", pattern, e.msg)))?;
        Ok(Self { glob, stem: None })
    }

    /// Pattern matching exactly `path`
    pub fn exact(path: &Path) -> BackendResult<Self> {
        Self::new(&Pattern::escape(&path.to_string_lossy()))
    }

    /// Pattern matching `stem_path` followed by any single extension
    pub fn any_extension(stem_path: &Path) -> BackendResult<Self> {
        let escaped = Pattern::escape(&stem_path.to_string_lossy());
        let mut pattern = Self::new(&format!("{}.*", escaped))?;
        pattern.stem = stem_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        Ok(pattern)
    }

    pub fn as_str(&self) -> &str {
        self.glob.as_str()
    }

    pub fn matches(&self, path: &Path) -> bool {
        if !self.glob.matches_path_with(path, MATCH_OPTIONS) {
            return false;
        }
        match &self.stem {
            Some(stem) => path
                .file_stem()
                .map(|s| s.to_string_lossy() == stem.as_str())
                .unwrap_or(false),
            None => true,
        }
    }
}
