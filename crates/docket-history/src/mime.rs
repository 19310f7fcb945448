// MIME type <-> file extension mapping for recorded documents

use std::path::Path;

/// MIME type reported for files whose extension is unknown
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

// (mime type, canonical extension, other extensions)
const TABLE: &[(&str, &str, &[&str])] = &[
    ("text/markdown", "md", &["markdown"]),
    ("text/html", "html", &["htm", "shtml"]),
    ("text/plain", "txt", &["text", "conf", "log"]),
    ("text/csv", "csv", &[]),
    ("text/xml", "xml", &[]),
    ("application/xml", "xml", &[]),
    ("application/json", "json", &[]),
    ("application/pdf", "pdf", &[]),
    ("application/msword", "doc", &[]),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "docx",
        &[],
    ),
    ("application/rtf", "rtf", &[]),
];

/// Canonical file extension for a MIME type, ignoring parameters such as
/// `; charset=utf-8`.
pub fn extension_for(mime_type: &str) -> Option<&'static str> {
    let essence = mime_type.split(';').next().unwrap_or("").trim();
    TABLE
        .iter()
        .find(|(mime, _, _)| mime.eq_ignore_ascii_case(essence))
        .map(|(_, extension, _)| *extension)
}

/// MIME type inferred from the extension of `path`
pub fn mime_type_for(path: &Path) -> &'static str {
    let Some(extension) = path.extension().map(|e| e.to_string_lossy().to_ascii_lowercase()) else {
        return DEFAULT_MIME_TYPE;
    };

    TABLE
        .iter()
        .find(|(_, canonical, others)| *canonical == extension || others.contains(&extension.as_str()))
        .map(|(mime, _, _)| *mime)
        .unwrap_or(DEFAULT_MIME_TYPE)
}

/// Whether content of this MIME type is stored as text
pub fn is_textual(mime_type: &str) -> bool {
    mime_type.starts_with("text/")
}
