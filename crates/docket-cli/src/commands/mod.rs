//! Command handlers for the docket CLI

use anyhow::Context;
use clap::Args;
use docket_history::{DocketConfig, DocumentId, Recorder};

pub mod query;
pub mod record;
pub mod repository;

pub use query::{handle_latest_command, handle_tracked_command};
pub use record::{handle_record_command, RecordArgs};
pub use repository::{handle_init_command, handle_publish_command};

/// Identity of the document a command works on
#[derive(Debug, Clone, Args)]
pub struct DocumentArgs {
    /// Document kind, e.g. "privacy-policy"
    #[arg(long)]
    pub kind: String,

    /// Collection the document belongs to
    #[arg(long)]
    pub collection: Option<String>,
}

impl DocumentArgs {
    pub fn into_id(self) -> DocumentId {
        DocumentId::new(self.collection, self.kind)
    }
}

/// Recorder over the configured repository
pub(crate) fn open_recorder(config: &DocketConfig) -> anyhow::Result<Recorder> {
    Recorder::open(&config.recorder)
        .with_context(|| format!("Could not open version repository at {}", config.recorder.root.display()))
}
