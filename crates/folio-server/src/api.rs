//! JSON API handlers.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use folio_dispatch::{BuildService, BuildTrigger, BuildWebhookConfig, ChangeEvent};
use folio_store::{DocumentUpdate, ErrorKind, FileStore, Frontmatter, NewDocument, StoreError};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::cache::SharedCache;

/// State shared by all handlers.
pub struct AppState {
    pub store: FileStore,
    pub cache: SharedCache,
    pub trigger: Arc<dyn BuildTrigger>,
    pub webhooks: BuildWebhookConfig,
}

pub type SharedState = Arc<AppState>;

/// Build the `/api` router.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/markdown-files", get(list_files).post(create_file))
        .route("/api/markdown-files/{id}", get(get_file).put(update_file))
        .route("/api/trigger-build", post(trigger_build))
        .route("/api/status", get(status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Error responses, rendered as `{success: false, error}`.
#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    /// Map a store error. `context` is the client-facing message for I/O
    /// failures; the underlying error is only logged.
    fn from_store(err: StoreError, context: &str) -> Self {
        match err.kind() {
            ErrorKind::Validation => Self::Validation(err.to_string()),
            ErrorKind::NotFound => Self::NotFound("Markdown file not found".to_string()),
            ErrorKind::Conflict => {
                Self::Conflict("A markdown file with that name already exists".to_string())
            }
            ErrorKind::Io => {
                tracing::error!("{}: {}", context, err);
                Self::Internal(context.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Validation(m) => (StatusCode::BAD_REQUEST, m),
            Self::NotFound(m) => (StatusCode::NOT_FOUND, m),
            Self::Conflict(m) => (StatusCode::CONFLICT, m),
            Self::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    pub filename: Option<String>,
    pub content: Option<String>,
    #[serde(default)]
    pub frontmatter: Option<Frontmatter>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub content: Option<String>,
    #[serde(default)]
    pub frontmatter: Option<Frontmatter>,
}

async fn list_files(State(state): State<SharedState>) -> Result<Response, ApiError> {
    let docs = state
        .store
        .list()
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to read markdown files"))?;

    state.cache.write().await.record_listing(&docs);

    Ok(Json(json!({ "success": true, "data": docs })).into_response())
}

async fn get_file(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let doc = state
        .store
        .get(&id)
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to read markdown file"))?;

    Ok(Json(json!({ "success": true, "data": doc })).into_response())
}

async fn create_file(
    State(state): State<SharedState>,
    payload: Result<Json<CreateRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;

    let doc = state
        .store
        .create(NewDocument {
            filename: request.filename,
            content: request.content,
            frontmatter: request.frontmatter.unwrap_or_default(),
        })
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to create markdown file"))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": doc })),
    )
        .into_response())
}

async fn update_file(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;

    let doc = state
        .store
        .update(
            &id,
            DocumentUpdate {
                content: request.content,
                frontmatter: request.frontmatter.unwrap_or_default(),
            },
        )
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to update markdown file"))?;

    Ok(Json(json!({ "success": true, "data": doc })).into_response())
}

/// Dispatch to every configured target. The `service` field only changes
/// the response message; a missing or non-string value is ignored.
async fn trigger_build(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request: Value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::Validation(format!("Invalid request body: {}", e)))?
    };

    let named = request
        .get("service")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<BuildService>().ok())
        .filter(|s| state.webhooks.is_configured(*s));

    state.trigger.dispatch(&ChangeEvent::manual()).await;

    let message = match named {
        Some(service) => format!("Build triggered for {}", service),
        None => "Build triggered for all configured services".to_string(),
    };

    Ok(Json(json!({ "success": true, "message": message })).into_response())
}

async fn status(State(state): State<SharedState>) -> Response {
    let cache = state.cache.read().await;
    let watching: PathBuf = std::path::absolute(state.store.root())
        .unwrap_or_else(|_| state.store.root().to_path_buf());

    Json(json!({
        "status": "running",
        "cacheLastUpdated": cache.last_updated(),
        "cacheLastInvalidated": cache.last_invalidated(),
        "configuredWebhooks": state.webhooks.configured_services(),
        "watchingDirectory": watching.display().to_string(),
        "cachedFiles": cache.len(),
    }))
    .into_response()
}
