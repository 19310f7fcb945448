//! `docket latest` and `docket tracked`

use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, Context};
use docket_history::{Content, DocketConfig, DocumentId};
use serde_json::{json, Value};

use super::open_recorder;
use crate::output::Output;

pub async fn handle_latest_command(
    config: &DocketConfig,
    document: DocumentId,
    target: Option<PathBuf>,
    output: &Output,
) -> anyhow::Result<()> {
    let recorder = open_recorder(config)?;
    let latest = recorder
        .latest_record(&document)
        .await
        .with_context(|| format!("Could not look up {}", document))?
        .ok_or_else(|| anyhow!("{} has never been recorded", document))?;

    if let Some(target) = &target {
        tokio::fs::write(target, latest.content.as_bytes())
            .await
            .with_context(|| format!("Could not write {}", target.display()))?;
    }

    if output.is_json() {
        let (content, encoding) = match &target {
            None => content_json(&latest.content),
            Some(_) => (Value::Null, Value::Null),
        };
        output.emit(
            "",
            json!({
                "document": document.to_string(),
                "version_id": latest.version_id,
                "mime_type": latest.mime_type,
                "bytes": latest.content.len(),
                "content": content,
                "encoding": encoding,
            }),
        );
        return Ok(());
    }

    match (&target, &latest.content) {
        (Some(target), _) => println!("Wrote {} ({}) to {}", latest.version_id, latest.mime_type, target.display()),
        (None, Content::Text(text)) => print!("{}", text),
        (None, Content::Binary(bytes)) => {
            std::io::stdout()
                .write_all(bytes)
                .context("Could not write content to stdout")?;
        }
    }
    Ok(())
}

/// Content as a JSON string, hex-encoded when it is not text
fn content_json(content: &Content) -> (Value, Value) {
    match content {
        Content::Text(text) => (json!(text), json!("utf-8")),
        Content::Binary(bytes) => (json!(hex::encode(bytes)), json!("hex")),
    }
}

pub async fn handle_tracked_command(config: &DocketConfig, document: DocumentId, output: &Output) -> anyhow::Result<()> {
    let recorder = open_recorder(config)?;
    let tracked = recorder
        .is_tracked(&document)
        .await
        .with_context(|| format!("Could not look up {}", document))?;

    let text = if tracked {
        format!("{} is tracked", document)
    } else {
        format!("{} is not tracked", document)
    };
    output.emit(text, json!({ "document": document.to_string(), "tracked": tracked }));
    Ok(())
}
