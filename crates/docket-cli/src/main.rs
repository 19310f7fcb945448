//! Docket CLI entry point
//!
//! Records document snapshots into a version repository and queries them.

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use docket_history::{logging, DocketConfig};

mod commands;
mod error;
mod output;

use commands::*;
use error::CliErrorHandler;
use output::Output;

//-----------------------------------------------------------------------------
// Command Definition
//-----------------------------------------------------------------------------

/// Docket command-line interface
///
/// Keeps the history of externally published documents in a git repository
#[derive(Debug, Parser)]
#[command(name = "docket", about = "Versioned document recording")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Version repository, overrides the configured root
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "docket_history=trace"
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Print results and errors as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose error output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the version repository if it does not exist
    Init {
        /// URL of the publish remote to register
        #[arg(long)]
        remote_url: Option<String>,
    },

    /// Record a snapshot of a document
    Record {
        #[command(flatten)]
        document: DocumentArgs,

        /// Read the snapshot from this file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Changelog stored with the new version
        #[arg(long)]
        changelog: Option<String>,

        /// File extension of the snapshot
        #[arg(long)]
        extension: Option<String>,

        /// MIME type of the snapshot
        #[arg(long)]
        mime_type: Option<String>,

        /// Publish after recording
        #[arg(long)]
        publish: bool,
    },

    /// Show the latest recorded version of a document
    Latest {
        #[command(flatten)]
        document: DocumentArgs,

        /// Write the content to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Tell whether a document was ever recorded
    Tracked {
        #[command(flatten)]
        document: DocumentArgs,
    },

    /// Push recorded versions to the configured remote
    Publish,
}

//-----------------------------------------------------------------------------
// Main Function
//-----------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let error_handler = CliErrorHandler::new(cli.verbose, cli.json);

    let result = run(cli).await;
    if let Err(err) = result {
        error_handler.handle_error(&err);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    if let Err(e) = logging::init_from_config(&config.logging) {
        eprintln!("Warning: could not initialize logging: {}", e);
    }

    let output = Output::new(cli.json);
    match cli.command {
        Command::Init { remote_url } => handle_init_command(&config, remote_url, &output).await,
        Command::Record {
            document,
            file,
            changelog,
            extension,
            mime_type,
            publish,
        } => {
            let args = RecordArgs {
                document: document.into_id(),
                file,
                changelog,
                extension,
                mime_type,
                publish,
            };
            handle_record_command(&config, args, &output).await
        }
        Command::Latest { document, output: target } => {
            handle_latest_command(&config, document.into_id(), target, &output).await
        }
        Command::Tracked { document } => handle_tracked_command(&config, document.into_id(), &output).await,
        Command::Publish => handle_publish_command(&config, &output).await,
    }
}

/// Configuration file and environment, then command-line overrides
fn load_config(cli: &Cli) -> anyhow::Result<DocketConfig> {
    let mut config = DocketConfig::load(cli.config.as_deref()).context("Could not load configuration")?;
    if let Some(root) = &cli.root {
        config.recorder.root = root.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_record_command() {
        let cli = Cli::try_parse_from([
            "docket",
            "--root",
            "/tmp/versions",
            "record",
            "--collection",
            "acme",
            "--kind",
            "privacy-policy",
            "--file",
            "policy.html",
            "--changelog",
            "initial capture",
        ])
        .unwrap();

        assert_eq!(cli.root, Some(PathBuf::from("/tmp/versions")));
        match cli.command {
            Command::Record {
                document,
                file,
                changelog,
                publish,
                ..
            } => {
                assert_eq!(
                    document.into_id(),
                    docket_history::DocumentId::in_collection("acme", "privacy-policy")
                );
                assert_eq!(file, Some(PathBuf::from("policy.html")));
                assert_eq!(changelog.as_deref(), Some("initial capture"));
                assert!(!publish);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["docket", "tracked", "--kind", "terms", "--json", "-v"]).unwrap();
        assert!(cli.json);
        assert!(cli.verbose);
    }
}
