//! One-off build trigger command.

use std::path::Path;

use anyhow::Result;
use folio_dispatch::{BuildTrigger, ChangeEvent};

use crate::config;

/// Dispatch a manual build to every configured target.
pub async fn run(config_path: &Path) -> Result<()> {
    let config = config::load(config_path)?;
    let dispatcher = config.dispatcher()?;

    let summary = dispatcher.dispatch(&ChangeEvent::manual()).await;

    if summary.failed > 0 {
        tracing::warn!(
            "{} of {} build hooks failed",
            summary.failed,
            summary.attempted()
        );
    }

    Ok(())
}
