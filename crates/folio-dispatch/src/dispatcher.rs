//! Build trigger dispatcher.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;

use crate::event::ChangeEvent;
use crate::git::{AutoCommit, CommitOutcome};
use crate::webhook::{payload, BuildService, BuildWebhookConfig};

/// Errors that can occur while setting up a dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// What a single dispatch did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSummary {
    pub commit: CommitOutcome,
    /// Webhooks that answered with a 2xx status
    pub delivered: usize,
    pub failed: usize,
}

impl DispatchSummary {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed
    }
}

/// Anything that can react to a change event by triggering builds.
#[async_trait]
pub trait BuildTrigger: Send + Sync {
    async fn dispatch(&self, event: &ChangeEvent) -> DispatchSummary;
}

/// Dispatcher settings.
#[derive(Debug, Clone, Default)]
pub struct DispatcherConfig {
    pub webhooks: BuildWebhookConfig,

    /// Bearer token for the GitHub repository dispatch target
    pub github_token: Option<String>,

    /// Per-request timeout; `None` keeps the HTTP client default
    pub timeout: Option<Duration>,
}

/// Commits the changed file (optionally) and notifies every webhook.
pub struct BuildDispatcher {
    config: DispatcherConfig,
    client: reqwest::Client,
    auto_commit: Option<AutoCommit>,
}

impl BuildDispatcher {
    pub fn new(config: DispatcherConfig) -> Result<Self, DispatchError> {
        let mut builder = reqwest::Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            config,
            client: builder.build()?,
            auto_commit: None,
        })
    }

    /// Enable auto-commit before webhooks are called.
    pub fn with_auto_commit(mut self, auto_commit: AutoCommit) -> Self {
        self.auto_commit = Some(auto_commit);
        self
    }

    pub fn webhooks(&self) -> &BuildWebhookConfig {
        &self.config.webhooks
    }

    pub fn auto_commit_enabled(&self) -> bool {
        self.auto_commit.is_some()
    }

    async fn send(&self, service: BuildService, url: &str, event: &ChangeEvent) -> bool {
        tracing::info!("Triggering {} build...", service);

        let body = payload(service, event, Utc::now());
        let mut request = self.client.post(url).json(&body);

        if service == BuildService::Github {
            request = request.header("Accept", "application/vnd.github.v3+json");
            match self.config.github_token.as_deref() {
                Some(token) if !token.is_empty() => request = request.bearer_auth(token),
                _ => tracing::warn!("GITHUB_TOKEN is not set; sending repository dispatch without authorization"),
            }
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Failed to trigger {} build: {}", service, e);
                return false;
            }
        };

        let status = response.status();
        if status.is_success() {
            tracing::debug!("{} build hook answered {}", service, status);
            return true;
        }

        if service == BuildService::Github {
            let text = response.text().await.unwrap_or_default();
            tracing::error!(
                "Failed to trigger {} build: status {}, response: {}",
                service,
                status,
                text
            );
        } else {
            tracing::error!("Failed to trigger {} build: status {}", service, status);
        }
        false
    }
}

#[async_trait]
impl BuildTrigger for BuildDispatcher {
    async fn dispatch(&self, event: &ChangeEvent) -> DispatchSummary {
        tracing::info!(
            "File change detected: {} - {}",
            event.change_type,
            event.file_name
        );

        let commit = match &self.auto_commit {
            Some(auto_commit) => auto_commit.run(event).await,
            None => CommitOutcome::Skipped,
        };

        let targets = self.config.webhooks.targets();
        if targets.is_empty() {
            tracing::warn!("No build webhooks configured");
            tracing::info!(
                "To enable auto-deployment set one of: {}",
                BuildService::ALL
                    .iter()
                    .map(|s| s.env_var())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            tracing::info!("The github target also needs GITHUB_TOKEN");
            return DispatchSummary {
                commit,
                delivered: 0,
                failed: 0,
            };
        }

        let results = join_all(
            targets
                .iter()
                .map(|(service, url)| self.send(*service, url, event)),
        )
        .await;

        let delivered = results.iter().filter(|ok| **ok).count();
        let summary = DispatchSummary {
            commit,
            delivered,
            failed: results.len() - delivered,
        };

        tracing::info!(
            "Build triggers sent: {} delivered, {} failed",
            summary.delivered,
            summary.failed
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ChangeType;
    use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    type Received = Arc<Mutex<Vec<(String, Option<String>, Value)>>>;

    /// Bind a receiver that records every POST and answers 500 on `/fail`.
    async fn spawn_receiver() -> (String, Received) {
        let received: Received = Arc::default();

        async fn record(
            State(received): State<Received>,
            uri: axum::http::Uri,
            headers: HeaderMap,
            Json(body): Json<Value>,
        ) -> StatusCode {
            let auth = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            received
                .lock()
                .unwrap()
                .push((uri.path().to_string(), auth, body));
            if uri.path() == "/fail" {
                StatusCode::INTERNAL_SERVER_ERROR
            } else {
                StatusCode::OK
            }
        }

        let app = Router::new()
            .route("/{hook}", post(record))
            .with_state(Arc::clone(&received));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), received)
    }

    #[tokio::test]
    async fn posts_to_every_configured_hook() {
        let (base, received) = spawn_receiver().await;
        let dispatcher = BuildDispatcher::new(DispatcherConfig {
            webhooks: BuildWebhookConfig {
                netlify: Some(format!("{}/netlify", base)),
                github: Some(format!("{}/github", base)),
                ..Default::default()
            },
            github_token: Some("secret".into()),
            timeout: None,
        })
        .unwrap();

        let summary = dispatcher
            .dispatch(&ChangeEvent::new(ChangeType::Add, "new.md"))
            .await;

        assert_eq!(summary.delivered, 2);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.commit, CommitOutcome::Skipped);

        let mut received = received.lock().unwrap().clone();
        received.sort_by(|a, b| a.0.cmp(&b.0));

        let (path, auth, body) = &received[0];
        assert_eq!(path, "/github");
        assert_eq!(auth.as_deref(), Some("Bearer secret"));
        assert_eq!(body["event_type"], "markdown_file_change");
        assert_eq!(body["client_payload"]["fileName"], "new.md");
        assert_eq!(body["client_payload"]["trigger"], "api_file_change");

        let (path, auth, body) = &received[1];
        assert_eq!(path, "/netlify");
        assert_eq!(auth, &None);
        assert_eq!(body["trigger"], "markdown_file_change");
        assert_eq!(body["changeType"], "add");
    }

    #[tokio::test]
    async fn one_failing_hook_does_not_affect_others() {
        let (base, received) = spawn_receiver().await;
        let dispatcher = BuildDispatcher::new(DispatcherConfig {
            webhooks: BuildWebhookConfig {
                vercel: Some(format!("{}/fail", base)),
                custom: Some(format!("{}/custom", base)),
                // Nothing listens on port 9 locally
                netlify: Some("http://127.0.0.1:9/unreachable".into()),
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap();

        let summary = dispatcher.dispatch(&ChangeEvent::manual()).await;

        assert_eq!(summary.delivered, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.attempted(), 3);
        assert_eq!(received.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn no_hooks_is_a_no_op() {
        let dispatcher = BuildDispatcher::new(DispatcherConfig::default()).unwrap();

        let summary = dispatcher.dispatch(&ChangeEvent::manual()).await;

        assert_eq!(summary.attempted(), 0);
    }
}
