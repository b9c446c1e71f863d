//! REST API: shared state, route table, and request handlers.
//!
//! Every non-2xx response carries a JSON [`ErrorBody`]. Request bodies are
//! read as raw bytes and validated by the record types so that malformed
//! input always maps to a `400` with a readable message.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::Value;

use taskdash_proto::{
    ErrorBody, NewTask, NewUser, Task, TaskId, TaskPatch, User, UserId, ValidationError,
};

use crate::store::{RecordError, RecordStore};

/// Shared server state.
pub struct AppState {
    /// Task and user records.
    pub records: RecordStore,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    /// Creates state over an empty, memory-only record store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_records(RecordStore::new())
    }

    /// Creates state over an existing record store.
    #[must_use]
    pub const fn with_records(records: RecordStore) -> Self {
        Self { records }
    }
}

/// A failed request, rendered as a status code plus `{error}` body.
#[derive(Debug, thiserror::Error)]
pub enum ApiFailure {
    /// Malformed id or body (`400`).
    #[error("{0}")]
    BadRequest(String),
    /// Unknown record (`404`).
    #[error("{0}")]
    NotFound(String),
    /// Storage failure (`500`).
    #[error("{0}")]
    Internal(String),
}

impl ApiFailure {
    /// HTTP status for this failure.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationError> for ApiFailure {
    fn from(e: ValidationError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<RecordError> for ApiFailure {
    fn from(e: RecordError) -> Self {
        match e {
            RecordError::TaskNotFound(_) | RecordError::UserNotFound(_) => {
                Self::NotFound(e.to_string())
            }
            RecordError::IdsExhausted(_)
            | RecordError::Io { .. }
            | RecordError::Corrupt { .. } => {
                tracing::error!(error = %e, "record store failure");
                Self::Internal("Internal server error".to_string())
            }
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorBody::new(self.to_string()))).into_response()
    }
}

/// Builds the API router over the given state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/tasks/{id}",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/{id}", get(get_user))
        .with_state(state)
}

/// Starts the API server on the given address.
///
/// Binds a TCP listener, spawns the axum server as a background task,
/// and returns the actual bound address (useful when binding to port 0)
/// and a [`tokio::task::JoinHandle`] for the server task.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(AppState::new())).await
}

/// Starts the API server with pre-built [`AppState`].
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<AppState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "api server error");
        }
    });

    Ok((bound_addr, handle))
}

/// Parses a JSON request body into an untyped value.
fn parse_body(body: &Bytes) -> Result<Value, ApiFailure> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "rejecting malformed JSON body");
        ApiFailure::BadRequest("Invalid JSON body".to_string())
    })
}

fn parse_task_id(raw: &str) -> Result<TaskId, ApiFailure> {
    raw.parse()
        .map_err(|_| ApiFailure::BadRequest(format!("Invalid task id: {raw}")))
}

fn parse_user_id(raw: &str) -> Result<UserId, ApiFailure> {
    raw.parse()
        .map_err(|_| ApiFailure::BadRequest(format!("Invalid user id: {raw}")))
}

async fn list_tasks(State(state): State<Arc<AppState>>) -> Json<Vec<Task>> {
    let tasks = state.records.list_tasks().await;
    tracing::debug!(count = tasks.len(), "listing tasks");
    Json(tasks)
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<Task>), ApiFailure> {
    let data = NewTask::from_json(&parse_body(&body)?)?;
    let task = state.records.create_task(data).await?;
    tracing::info!(task_id = %task.id, user_id = %task.user_id, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<Task>, ApiFailure> {
    let id = parse_task_id(&raw_id)?;
    state
        .records
        .get_task(id)
        .await
        .map(Json)
        .ok_or_else(|| RecordError::TaskNotFound(id).into())
}

async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    body: Bytes,
) -> Result<Json<Task>, ApiFailure> {
    let id = parse_task_id(&raw_id)?;
    let patch = TaskPatch::from_json(&parse_body(&body)?)?;
    let task = state.records.update_task(id, &patch).await?;
    tracing::info!(task_id = %id, "task updated");
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiFailure> {
    let id = parse_task_id(&raw_id)?;
    state.records.delete_task(id).await?;
    tracing::info!(task_id = %id, "task deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn list_users(State(state): State<Arc<AppState>>) -> Json<Vec<User>> {
    Json(state.records.list_users().await)
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<User>), ApiFailure> {
    let data = NewUser::from_json(&parse_body(&body)?)?;
    let user = state.records.create_user(data).await?;
    tracing::info!(user_id = %user.id, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<User>, ApiFailure> {
    let id = parse_user_id(&raw_id)?;
    state
        .records
        .get_user(id)
        .await
        .map(Json)
        .ok_or_else(|| RecordError::UserNotFound(id).into())
}
