//! Initialize a content directory.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config;

/// Run the init command.
pub async fn run(config_path: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing folio...");

    // Create default config
    if !config_path.exists() || yes {
        fs::write(config_path, DEFAULT_CONFIG)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        tracing::info!("Created {}", config_path.display());
    }

    let config = config::load(config_path)?;
    let dir = &config.markdown_dir;

    if dir.exists() {
        if !yes {
            tracing::warn!(
                "{}/ directory already exists. Use --yes to overwrite the sample post.",
                dir.display()
            );
            return Ok(());
        }
    } else {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    // Create sample post
    let welcome = dir.join("welcome.md");
    if !welcome.exists() || yes {
        fs::write(&welcome, DEFAULT_POST).context("Failed to write welcome.md")?;
        tracing::info!("Created {}", welcome.display());
    }

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'folio serve' to start the API server.");

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Folio Configuration
#
# Environment variables override these values:
# PORT, MARKDOWN_DIR, NETLIFY_BUILD_HOOK_URL, VERCEL_BUILD_HOOK_URL,
# GITHUB_BUILD_HOOK_URL, CUSTOM_BUILD_HOOK_URL, GITHUB_TOKEN, AUTO_COMMIT

[server]
# Directory of markdown files served by the API
markdown_dir = "markdown-files"
host = "127.0.0.1"
port = 3001

[watch]
# Quiet period before a burst of changes triggers builds
debounce_ms = 2000
# A file must keep the same size this long before its change counts
stability_threshold_ms = 1000
poll_interval_ms = 100

[webhooks]
# netlify = "https://api.netlify.com/build_hooks/..."
# vercel = "https://api.vercel.com/v1/integrations/deploy/..."
# github = "https://api.github.com/repos/OWNER/REPO/dispatches"
# custom = "https://example.com/build"

[git]
# Commit and push changed files before calling webhooks
auto_commit = false
"#;

const DEFAULT_POST: &str = r#"---
title: Welcome
description: Your first post, served by the folio API
template: template1
date: 2024-01-01
author: Site Admin
---

# Welcome

This post lives in a plain markdown file. Edit it in any editor or through
the API and connected sites rebuild automatically.

## Front matter

Every field in the block above is returned next to `id`, `slug` and
`content` by `GET /api/markdown-files`.
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use folio_store::MarkdownDocument;

    #[test]
    fn sample_post_parses() {
        let doc = MarkdownDocument::parse("welcome", DEFAULT_POST).unwrap();

        assert_eq!(doc.title(), Some("Welcome"));
        assert!(doc.content.starts_with("# Welcome"));
    }

    #[test]
    fn default_config_parses() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("folio.toml");
        fs::write(&path, DEFAULT_CONFIG).unwrap();

        let config = config::load_with_env(&path, |_| None).unwrap();

        assert_eq!(config.port, 3001);
        assert!(config.dispatch.webhooks.targets().is_empty());
    }
}
