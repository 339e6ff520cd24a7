//! File handlers: upload staging, result download and removal.

use super::{FileQuery, IdResponse, header_or_query, parse_flag};
use crate::api::AppState;
use crate::error::Error;
use crate::types::{TaskId, UploadId};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

/// POST /file - Stage an upload into a new upload area
pub async fn upload_file(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    stage(&state, None, &query, &headers, body).await
}

/// POST /file/:id - Stage an upload into an existing (or new) upload area
pub async fn upload_file_with_id(
    State(state): State<AppState>,
    Path(id): Path<UploadId>,
    Query(query): Query<FileQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    stage(&state, Some(id), &query, &headers, body).await
}

async fn stage(
    state: &AppState,
    id: Option<UploadId>,
    query: &FileQuery,
    headers: &HeaderMap,
    body: Bytes,
) -> Response {
    let Some(filename) = header_or_query(headers, "filename", query.filename.as_deref()) else {
        return Error::InvalidRequest("filename is required".to_string()).into_response();
    };
    let unzip = parse_flag(header_or_query(headers, "unzip", query.unzip.as_deref()).as_deref());

    match state
        .orchestrator
        .stage_upload(id, &filename, body.to_vec(), unzip)
        .await
    {
        Ok(id) => (StatusCode::CREATED, Json(IdResponse { id })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /file/:id - Download a named file, or a ZIP of the whole directory
pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
    Query(query): Query<FileQuery>,
    headers: HeaderMap,
) -> Response {
    let filename = header_or_query(&headers, "filename", query.filename.as_deref());

    let materialized = match state.orchestrator.materialize(id, filename.as_deref()).await {
        Ok(materialized) => materialized,
        Err(e) => return e.into_response(),
    };

    let disposition = format!(
        "attachment; filename=\"{}\"",
        materialized.file_name().replace('"', "")
    );
    let disposition = HeaderValue::from_str(&disposition)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    (
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        materialized.into_bytes(),
    )
        .into_response()
}

/// DELETE /file - Remove every upload area and working directory
pub async fn delete_all_files(State(state): State<AppState>) -> Response {
    match state.orchestrator.remove_files(None).await {
        Ok(removed) => (StatusCode::OK, Json(json!({ "removed": removed }))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// DELETE /file/:id - Remove one directory
pub async fn delete_files(State(state): State<AppState>, Path(id): Path<TaskId>) -> Response {
    match state.orchestrator.remove_files(Some(id)).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}
