//! Configuration loading: defaults, then `folio.toml`, then environment.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use folio_dispatch::{BuildService, BuildWebhookConfig};
use folio_server::ServerConfig;
use serde::Deserialize;

/// Configuration file structure (folio.toml).
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    watch: WatchSection,
    #[serde(default)]
    webhooks: WebhooksSection,
    #[serde(default)]
    git: GitSection,
}

#[derive(Debug, Deserialize, Default)]
struct ServerSection {
    markdown_dir: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Deserialize, Default)]
struct WatchSection {
    debounce_ms: Option<u64>,
    stability_threshold_ms: Option<u64>,
    poll_interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct WebhooksSection {
    #[serde(flatten)]
    urls: BuildWebhookConfig,
    github_token: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct GitSection {
    auto_commit: Option<bool>,
}

/// Load configuration from the process environment and `path` if it exists.
pub fn load(path: &Path) -> Result<ServerConfig> {
    load_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration using `env` to look up environment variables.
/// Returns an error if the config file exists but is malformed.
pub fn load_with_env(path: &Path, env: impl Fn(&str) -> Option<String>) -> Result<ServerConfig> {
    let file = if path.exists() {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file: ConfigFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        tracing::info!("Loaded config from {}", path.display());
        file
    } else {
        ConfigFile::default()
    };

    let mut config = ServerConfig::default();
    apply_file(&mut config, file);
    apply_env(&mut config, env)?;
    Ok(config)
}

fn apply_file(config: &mut ServerConfig, file: ConfigFile) {
    if let Some(dir) = file.server.markdown_dir {
        config.markdown_dir = dir;
    }
    if let Some(host) = file.server.host {
        config.host = host;
    }
    if let Some(port) = file.server.port {
        config.port = port;
    }

    if let Some(ms) = file.watch.debounce_ms {
        config.debounce = Duration::from_millis(ms);
    }
    if let Some(ms) = file.watch.stability_threshold_ms {
        config.watch.stability_threshold = Duration::from_millis(ms);
    }
    if let Some(ms) = file.watch.poll_interval_ms {
        config.watch.poll_interval = Duration::from_millis(ms);
    }

    config.dispatch.webhooks = file.webhooks.urls;
    config.dispatch.github_token = file.webhooks.github_token;
    config.dispatch.timeout = file.webhooks.timeout_secs.map(Duration::from_secs);

    if let Some(enabled) = file.git.auto_commit {
        config.auto_commit = enabled;
    }
}

fn apply_env(config: &mut ServerConfig, env: impl Fn(&str) -> Option<String>) -> Result<()> {
    let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

    if let Some(port) = var("PORT") {
        config.port = port
            .trim()
            .parse()
            .with_context(|| format!("Invalid PORT: {}", port))?;
    }
    if let Some(dir) = var("MARKDOWN_DIR") {
        config.markdown_dir = PathBuf::from(dir);
    }

    for service in BuildService::ALL {
        if let Some(url) = var(service.env_var()) {
            config.dispatch.webhooks.set(service, Some(url));
        }
    }

    if let Some(token) = var("GITHUB_TOKEN") {
        config.dispatch.github_token = Some(token);
    }
    if let Some(flag) = var("AUTO_COMMIT") {
        config.auto_commit = parse_flag(&flag);
    }

    Ok(())
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_file_or_env() {
        let temp = tempdir().unwrap();

        let config = load_with_env(&temp.path().join("folio.toml"), env(&[])).unwrap();

        assert_eq!(config.port, 3001);
        assert_eq!(config.markdown_dir, PathBuf::from("markdown-files"));
        assert!(!config.auto_commit);
        assert!(config.dispatch.webhooks.targets().is_empty());
    }

    #[test]
    fn reads_file_sections() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("folio.toml");
        fs::write(
            &path,
            r#"
[server]
markdown_dir = "content"
port = 4000

[watch]
debounce_ms = 500

[webhooks]
netlify = "https://api.netlify.com/build_hooks/abc"
timeout_secs = 30

[git]
auto_commit = true
"#,
        )
        .unwrap();

        let config = load_with_env(&path, env(&[])).unwrap();

        assert_eq!(config.port, 4000);
        assert_eq!(config.markdown_dir, PathBuf::from("content"));
        assert_eq!(config.debounce, Duration::from_millis(500));
        assert_eq!(config.dispatch.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.dispatch.webhooks.configured_services(), vec!["netlify"]);
        assert!(config.auto_commit);
    }

    #[test]
    fn environment_overrides_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("folio.toml");
        fs::write(&path, "[server]\nport = 4000\n[git]\nauto_commit = true\n").unwrap();

        let config = load_with_env(
            &path,
            env(&[
                ("PORT", "5000"),
                ("GITHUB_BUILD_HOOK_URL", "https://api.github.com/repos/o/r/dispatches"),
                ("GITHUB_TOKEN", "token"),
                ("VERCEL_BUILD_HOOK_URL", ""),
                ("AUTO_COMMIT", "false"),
            ]),
        )
        .unwrap();

        assert_eq!(config.port, 5000);
        assert_eq!(config.dispatch.webhooks.configured_services(), vec!["github"]);
        assert_eq!(config.dispatch.github_token.as_deref(), Some("token"));
        assert!(!config.auto_commit);
    }

    #[test]
    fn errors_on_malformed_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("folio.toml");
        fs::write(&path, "[server\nport = ").unwrap();

        assert!(load_with_env(&path, env(&[])).is_err());
    }

    #[test]
    fn errors_on_invalid_port() {
        let temp = tempdir().unwrap();

        let result = load_with_env(&temp.path().join("none.toml"), env(&[("PORT", "abc")]));

        assert!(result.is_err());
    }
}
