//! API server command.

use std::path::{Path, PathBuf};

use anyhow::Result;
use folio_server::ContentServer;

use crate::config;

/// Run the API server.
pub async fn run(config_path: &Path, port: Option<u16>, dir: Option<PathBuf>) -> Result<()> {
    let mut config = config::load(config_path)?;
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(dir) = dir {
        config.markdown_dir = dir;
    }

    tracing::info!("Starting API server on port {}", config.port);

    ContentServer::new(config).start().await?;

    Ok(())
}
