//! Task handlers: submission, cancellation and status.

use super::{IdResponse, StatusQuery};
use crate::api::AppState;
use crate::error::Error;
use crate::types::{TaskId, TaskState};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// POST /task - Submit a job under a generated id
pub async fn submit_task(State(state): State<AppState>, body: String) -> Response {
    submit(&state, &body, None).await
}

/// POST /task/:id - Submit a job under a caller-chosen id
pub async fn submit_task_with_id(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
    body: String,
) -> Response {
    submit(&state, &body, Some(id)).await
}

async fn submit(state: &AppState, body: &str, id: Option<TaskId>) -> Response {
    match state.orchestrator.submit(body, id).await {
        Ok(id) => (StatusCode::CREATED, Json(IdResponse { id })).into_response(),
        Err(e) => {
            tracing::debug!(error = %e, "submission rejected");
            e.into_response()
        }
    }
}

/// DELETE /task - Cancel every unfinished task
pub async fn cancel_all_tasks(State(state): State<AppState>) -> impl IntoResponse {
    let cancelled = state.orchestrator.cancel_all().await;
    (StatusCode::OK, Json(json!({ "cancelled": cancelled })))
}

/// DELETE /task/:id - Cancel one task
///
/// Cancelling a finished task succeeds without changing it.
pub async fn cancel_task(State(state): State<AppState>, Path(id): Path<TaskId>) -> Response {
    match state.orchestrator.cancel(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /status/all - Status of every known task
pub async fn list_statuses(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Response {
    let filter = match query.state.as_deref().map(str::parse::<TaskState>) {
        None => None,
        Some(Ok(task_state)) => Some(task_state),
        Some(Err(message)) => return Error::InvalidRequest(message).into_response(),
    };

    let statuses = state.orchestrator.all_statuses(filter).await;
    (StatusCode::OK, Json(statuses)).into_response()
}

/// GET /status/:id - Status of one task
pub async fn get_status(State(state): State<AppState>, Path(id): Path<TaskId>) -> Response {
    match state.orchestrator.status_of(id).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => e.into_response(),
    }
}
