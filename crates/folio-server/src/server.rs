//! Content API server.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use folio_dispatch::{
    AutoCommit, BuildDispatcher, BuildTrigger, DispatchError, DispatcherConfig, GitCli,
};
use folio_store::FileStore;

use crate::api::{router, AppState};
use crate::cache::ContentCache;
use crate::pipeline::{ChangePipeline, DEFAULT_DEBOUNCE};
use crate::watcher::{FileWatcher, WatchOptions};

/// Configuration for the content server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory containing markdown files
    pub markdown_dir: PathBuf,

    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Webhook targets and HTTP client settings
    pub dispatch: DispatcherConfig,

    /// Commit and push changed files before calling webhooks
    pub auto_commit: bool,

    /// Quiet window before a change triggers builds
    pub debounce: Duration,

    /// Write-stability filter for watched files
    pub watch: WatchOptions,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            markdown_dir: PathBuf::from("markdown-files"),
            host: "127.0.0.1".to_string(),
            port: 3001,
            dispatch: DispatcherConfig::default(),
            auto_commit: false,
            debounce: DEFAULT_DEBOUNCE,
            watch: WatchOptions::default(),
        }
    }
}

impl ServerConfig {
    /// Build the dispatcher described by this configuration.
    pub fn dispatcher(&self) -> Result<BuildDispatcher, DispatchError> {
        let dispatcher = BuildDispatcher::new(self.dispatch.clone())?;
        if self.auto_commit {
            let git = GitCli::new(&self.markdown_dir);
            Ok(dispatcher.with_auto_commit(AutoCommit::new(Box::new(git))))
        } else {
            Ok(dispatcher)
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind to {0}: {1}")]
    BindError(String, String),

    #[error("Failed to prepare markdown directory {0}: {1}")]
    StoreError(PathBuf, String),

    #[error("File watch error: {0}")]
    WatchError(String),

    #[error("Server error: {0}")]
    Serve(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Content API server with change watching.
pub struct ContentServer {
    config: ServerConfig,
}

impl ContentServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Run until Ctrl-C.
    pub async fn start(self) -> Result<(), ServerError> {
        let bind_to = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind((self.config.host.as_str(), self.config.port))
            .await
            .map_err(|e| ServerError::BindError(bind_to.clone(), e.to_string()))?;
        let addr = listener
            .local_addr()
            .map_err(|e| ServerError::BindError(bind_to, e.to_string()))?;

        let dir = &self.config.markdown_dir;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| ServerError::StoreError(dir.clone(), e.to_string()))?;

        let dispatcher = self.config.dispatcher()?;
        let webhooks = dispatcher.webhooks().clone();
        let trigger: Arc<dyn BuildTrigger> = Arc::new(dispatcher);

        let cache = ContentCache::shared();
        let pipeline = ChangePipeline::new(
            Arc::clone(&cache),
            Arc::clone(&trigger),
            self.config.debounce,
        );

        let (watcher, events) = FileWatcher::new(dir, self.config.watch)
            .map_err(|e| ServerError::WatchError(e.to_string()))?;
        pipeline.start(events).await;

        let state = Arc::new(AppState {
            store: FileStore::new(dir),
            cache,
            trigger,
            webhooks: webhooks.clone(),
        });
        let app = router(state);

        tracing::info!("API server running on http://{}", addr);
        tracing::info!("Markdown files endpoint: http://{}/api/markdown-files", addr);
        tracing::info!("Manual build trigger: http://{}/api/trigger-build", addr);
        tracing::info!("Server status: http://{}/api/status", addr);
        tracing::info!("Watching for markdown file changes in: {}", dir.display());

        let services = webhooks.configured_services();
        if services.is_empty() {
            tracing::warn!(
                "No build webhooks configured. Set environment variables to enable auto-deployment."
            );
        } else {
            tracing::info!("Build webhooks configured for: {}", services.join(", "));
        }
        if self.config.auto_commit {
            tracing::info!("Auto-commit enabled");
        }

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Serve(e.to_string()));

        pipeline.shutdown().await;
        drop(watcher);
        tracing::info!("Server stopped");

        served
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_dispatch::BuildWebhookConfig;

    #[test]
    fn creates_server_with_default_config() {
        let server = ContentServer::new(ServerConfig::default());
        assert_eq!(server.config.port, 3001);
        assert_eq!(server.config.debounce, Duration::from_millis(2000));
    }

    #[test]
    fn builds_dispatcher_with_auto_commit() {
        let config = ServerConfig {
            auto_commit: true,
            dispatch: DispatcherConfig {
                webhooks: BuildWebhookConfig {
                    custom: Some("http://localhost/hook".into()),
                    ..Default::default()
                },
                ..Default::default()
            },
            ..Default::default()
        };

        let dispatcher = config.dispatcher().unwrap();

        assert!(dispatcher.auto_commit_enabled());
        assert_eq!(dispatcher.webhooks().configured_services(), vec!["custom"]);
    }

    #[tokio::test]
    async fn reports_bind_failure_before_touching_the_store() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("content");

        let err = ContentServer::new(ServerConfig {
            port,
            markdown_dir: dir.clone(),
            ..Default::default()
        })
        .start()
        .await
        .unwrap_err();

        assert!(matches!(err, ServerError::BindError(..)));
        assert!(!dir.exists());
    }
}
