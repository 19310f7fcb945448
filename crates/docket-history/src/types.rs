// Core value types shared across the recorder
//
// Document identities, opaque version ids and recorded content.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a recorded version.
///
/// Produced by a backend (a commit hash for git). Callers must treat it as an
/// unstructured string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(String);

impl VersionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VersionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identity of a tracked document stream: an optional collection plus a
/// document kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId {
    collection: Option<String>,
    kind: String,
}

impl DocumentId {
    /// Create an identity, scoped to `collection` when one is given
    pub fn new(collection: Option<impl Into<String>>, kind: impl Into<String>) -> Self {
        Self {
            collection: collection.map(Into::into),
            kind: kind.into(),
        }
    }

    /// Document belonging to a collection
    pub fn in_collection(collection: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            collection: Some(collection.into()),
            kind: kind.into(),
        }
    }

    /// Collection-wide document, stored directly under the root
    pub fn collection_wide(kind: impl Into<String>) -> Self {
        Self {
            collection: None,
            kind: kind.into(),
        }
    }

    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Check that both components map to a single path segment.
    ///
    /// A segment must be non-empty, must not be `.` or `..` and must not
    /// contain a path separator. This keeps every identity under the root and
    /// guarantees that distinct identities never share a path.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(collection) = &self.collection {
            check_segment("collection", collection)?;
        }
        check_segment("document kind", &self.kind)
    }
}

fn check_segment(label: &str, segment: &str) -> Result<(), String> {
    if segment.is_empty() {
        return Err(format!("{} must not be empty", label));
    }
    if segment == "." || segment == ".." {
        return Err(format!("{} must not be '{}'", label, segment));
    }
    if segment.eq_ignore_ascii_case(".git") {
        return Err(format!("{} '{}' is reserved by the repository", label, segment));
    }
    if segment.contains('/') || segment.contains('\\') || segment.contains('\0') {
        return Err(format!("{} '{}' contains a path separator", label, segment));
    }
    Ok(())
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.collection {
            Some(collection) => write!(f, "{}/{}", collection, self.kind),
            None => f.write_str(&self.kind),
        }
    }
}

/// Snapshot content, either decoded text or raw bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Binary(Vec<u8>),
}

impl Content {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Content::Text(text) => text.as_bytes(),
            Content::Binary(bytes) => bytes,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Content::Text(text) => text.into_bytes(),
            Content::Binary(bytes) => bytes,
        }
    }

    /// Text view, only for content decoded as text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(text),
            Content::Binary(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Content {
    fn from(bytes: Vec<u8>) -> Self {
        Content::Binary(bytes)
    }
}

impl From<&[u8]> for Content {
    fn from(bytes: &[u8]) -> Self {
        Content::Binary(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_display() {
        assert_eq!(DocumentId::in_collection("acme", "privacy-policy").to_string(), "acme/privacy-policy");
        assert_eq!(DocumentId::collection_wide("glossary").to_string(), "glossary");
    }

    #[test]
    fn test_document_id_rejects_unsafe_segments() {
        assert!(DocumentId::in_collection("acme", "terms").validate().is_ok());
        assert!(DocumentId::collection_wide("terms").validate().is_ok());

        assert!(DocumentId::in_collection("", "terms").validate().is_err());
        assert!(DocumentId::in_collection("acme", "").validate().is_err());
        assert!(DocumentId::in_collection("..", "terms").validate().is_err());
        assert!(DocumentId::in_collection("acme", "../terms").validate().is_err());
        assert!(DocumentId::in_collection("a/b", "terms").validate().is_err());
        assert!(DocumentId::collection_wide("a\\b").validate().is_err());
        assert!(DocumentId::in_collection(".git", "terms").validate().is_err());
        assert!(DocumentId::in_collection(".GIT", "terms").validate().is_err());
        assert!(DocumentId::collection_wide(".Git").validate().is_err());
        assert!(DocumentId::in_collection("acme", ".gitignore").validate().is_ok());
    }

    #[test]
    fn test_content_bytes_view() {
        let text = Content::from("v1 text");
        assert_eq!(text.as_bytes(), b"v1 text");
        assert_eq!(text.as_text(), Some("v1 text"));

        let binary = Content::from(vec![0u8, 159, 146, 150]);
        assert_eq!(binary.len(), 4);
        assert_eq!(binary.as_text(), None);
    }
}
