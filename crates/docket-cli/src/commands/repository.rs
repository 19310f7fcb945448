//! `docket init` and `docket publish`

use anyhow::Context;
use docket_history::{DocketConfig, GitBackend};
use serde_json::json;
use tracing::info;

use super::open_recorder;
use crate::output::Output;

pub async fn handle_init_command(config: &DocketConfig, remote_url: Option<String>, output: &Output) -> anyhow::Result<()> {
    let root = &config.recorder.root;
    let backend = GitBackend::open_or_init(root, config.recorder.git_settings())
        .with_context(|| format!("Could not initialize version repository at {}", root.display()))?;

    if let Some(url) = &remote_url {
        backend
            .set_remote(&config.recorder.remote, url)
            .await
            .with_context(|| format!("Could not register remote '{}'", config.recorder.remote))?;
        info!(remote = %config.recorder.remote, url = %url, "registered publish remote");
    }

    output.emit(
        format!("Version repository ready at {}", root.display()),
        json!({
            "root": root.display().to_string(),
            "remote": remote_url.as_ref().map(|_| &config.recorder.remote),
        }),
    );
    Ok(())
}

pub async fn handle_publish_command(config: &DocketConfig, output: &Output) -> anyhow::Result<()> {
    let recorder = open_recorder(config)?;
    recorder.publish().await.context("Could not publish versions")?;

    output.emit(
        format!("Published to '{}'", config.recorder.remote),
        json!({ "remote": config.recorder.remote, "published": true }),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_init_registers_remote() {
        let repo = tempdir().unwrap();
        let mut config = DocketConfig::default();
        config.recorder.root = repo.path().join("versions");

        handle_init_command(&config, Some("https://example.org/versions.git".to_string()), &Output::new(true))
            .await
            .unwrap();

        let opened = git2::Repository::open(&config.recorder.root).unwrap();
        let remote = opened.find_remote("origin").unwrap();
        assert_eq!(remote.url(), Some("https://example.org/versions.git"));
    }

    #[tokio::test]
    async fn test_publish_without_remote_fails() {
        let repo = tempdir().unwrap();
        let mut config = DocketConfig::default();
        config.recorder.root = repo.path().to_path_buf();

        let err = handle_publish_command(&config, &Output::new(false)).await.unwrap_err();
        assert_eq!(err.to_string(), "Could not publish versions");
    }
}
