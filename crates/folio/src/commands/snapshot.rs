//! Static fallback snapshot command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use folio_store::FileStore;

use crate::config;

/// Write every document as a JSON array, in the same shape the API serves.
pub async fn run(config_path: &Path, output: PathBuf) -> Result<()> {
    let config = config::load(config_path)?;

    let count = write_snapshot(&FileStore::new(&config.markdown_dir), &output).await?;

    tracing::info!("Wrote {} posts to {}", count, output.display());
    Ok(())
}

pub(crate) async fn write_snapshot(store: &FileStore, output: &Path) -> Result<usize> {
    let docs = store
        .list()
        .await
        .with_context(|| format!("Failed to read {}", store.root().display()))?;

    let json = serde_json::to_string_pretty(&docs).context("Failed to serialize posts")?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(output, json)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    Ok(docs.len())
}
