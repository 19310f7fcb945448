//! `docket record`

use std::path::{Path, PathBuf};

use anyhow::Context;
use docket_history::{mime, Content, DocketConfig, DocumentId, RecordOutcome, RecordRequest};
use serde_json::json;
use tokio::io::AsyncReadExt;
use tracing::debug;

use super::open_recorder;
use crate::output::Output;

#[derive(Debug, Clone)]
pub struct RecordArgs {
    pub document: DocumentId,
    pub file: Option<PathBuf>,
    pub changelog: Option<String>,
    pub extension: Option<String>,
    pub mime_type: Option<String>,
    pub publish: bool,
}

pub async fn handle_record_command(config: &DocketConfig, args: RecordArgs, output: &Output) -> anyhow::Result<()> {
    let bytes = read_input(args.file.as_deref()).await?;
    let content = match String::from_utf8(bytes) {
        Ok(text) => Content::Text(text),
        Err(e) => Content::Binary(e.into_bytes()),
    };

    let mut request = RecordRequest::new(args.document.clone(), content);
    if let Some(changelog) = args.changelog {
        request = request.with_changelog(changelog);
    }
    if let Some(extension) = args.extension {
        request = request.with_extension(extension);
    }
    if let Some(mime_type) = args.mime_type.or_else(|| args.file.as_deref().and_then(infer_mime_type)) {
        request = request.with_mime_type(mime_type);
    }

    let recorder = open_recorder(config)?;
    let record = recorder
        .record(request)
        .await
        .with_context(|| format!("Could not record {}", args.document))?;

    if args.publish && record.is_committed() {
        recorder.publish().await.context("Recorded, but could not publish")?;
    }

    let text = match &record.outcome {
        RecordOutcome::Committed(version_id) if record.is_first_version => {
            format!("Started tracking {} at {}", args.document, version_id)
        }
        RecordOutcome::Committed(version_id) => format!("Recorded {} at {}", args.document, version_id),
        RecordOutcome::Unchanged => format!("No changes to {}", args.document),
    };
    output.emit(
        text,
        json!({
            "document": args.document.to_string(),
            "path": record.path.display().to_string(),
            "version_id": record.version_id(),
            "is_first_version": record.is_first_version,
            "published": args.publish && record.is_committed(),
        }),
    );
    Ok(())
}

async fn read_input(file: Option<&Path>) -> anyhow::Result<Vec<u8>> {
    match file {
        Some(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("Could not read {}", path.display())),
        None => {
            let mut bytes = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut bytes)
                .await
                .context("Could not read snapshot from stdin")?;
            Ok(bytes)
        }
    }
}

/// MIME type implied by the input file's extension, when it is a known one
fn infer_mime_type(path: &Path) -> Option<String> {
    let mime_type = mime::mime_type_for(path);
    if mime_type == mime::DEFAULT_MIME_TYPE {
        return None;
    }
    debug!(path = %path.display(), mime_type, "inferred MIME type from input file");
    Some(mime_type.to_string())
}
