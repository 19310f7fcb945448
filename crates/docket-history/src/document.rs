// Document type registry and commit message synthesis

use std::collections::BTreeMap;

use crate::types::DocumentId;

/// Display names for the document kinds shipped by default
const BUILTIN_TYPES: &[(&str, &str)] = &[
    ("terms-of-service", "Terms of Service"),
    ("privacy-policy", "Privacy Policy"),
    ("cookie-policy", "Cookie Policy"),
    ("community-guidelines", "Community Guidelines"),
    ("acceptable-use-policy", "Acceptable Use Policy"),
    ("data-processing-agreement", "Data Processing Agreement"),
];

/// Registry mapping document kinds to human-readable names
#[derive(Debug, Clone)]
pub struct DocumentTypes {
    names: BTreeMap<String, String>,
}

impl DocumentTypes {
    /// Registry holding only the built-in kinds
    pub fn builtin() -> Self {
        Self {
            names: BUILTIN_TYPES
                .iter()
                .map(|(kind, name)| (kind.to_string(), name.to_string()))
                .collect(),
        }
    }

    /// Built-in kinds, overridden and extended by `overrides`
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut types = Self::builtin();
        for (kind, name) in overrides {
            types.register(kind.clone(), name.clone());
        }
        types
    }

    pub fn register(&mut self, kind: impl Into<String>, name: impl Into<String>) {
        self.names.insert(kind.into(), name.into());
    }

    /// Display name of `kind`; unregistered kinds are shown as-is
    pub fn display_name<'a>(&'a self, kind: &'a str) -> &'a str {
        self.names.get(kind).map(String::as_str).unwrap_or(kind)
    }

    /// One-line commit subject for a new version of `id`
    pub fn commit_subject(&self, id: &DocumentId, is_first_version: bool) -> String {
        let action = if is_first_version { "Start tracking" } else { "Update" };
        let name = self.display_name(id.kind());
        match id.collection() {
            Some(collection) => format!("{} {} {}", action, collection, name),
            None => format!("{} {}", action, name),
        }
    }

    /// Subject, followed by a blank line and the changelog when there is one
    pub fn commit_message(&self, id: &DocumentId, is_first_version: bool, changelog: Option<&str>) -> String {
        let subject = self.commit_subject(id, is_first_version);
        match changelog.map(str::trim).filter(|body| !body.is_empty()) {
            Some(body) => format!("{}\n\n{}", subject, body),
            None => subject,
        }
    }
}

impl Default for DocumentTypes {
    fn default() -> Self {
        Self::builtin()
    }
}
