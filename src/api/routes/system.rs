//! System handlers: health and the event stream.

use crate::api::AppState;
use crate::types::Event;
use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{
        IntoResponse,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
};
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

/// GET /health - "ready" when idle, "running (n)" otherwise
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.orchestrator.health().to_string(),
    )
}

/// GET /events - Server-sent events stream
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let receiver = state.orchestrator.subscribe();
    let stream = BroadcastStream::new(receiver);

    let sse_stream = stream.filter_map(|result| match result {
        Ok(event) => match serde_json::to_string(&event) {
            Ok(json_data) => Some(Ok(SseEvent::default()
                .event(event_name(&event))
                .data(json_data))),
            Err(e) => {
                tracing::warn!("Failed to serialize event to JSON: {}", e);
                None
            }
        },
        Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!("SSE client lagged, skipped {} events", skipped);
            Some(Ok(SseEvent::default().event("error").data(format!(
                r#"{{"error":"lagged","skipped":{}}}"#,
                skipped
            ))))
        }
    });

    Sse::new(sse_stream).keep_alive(KeepAlive::default())
}

/// SSE event name, matching the serialized `type` tag
fn event_name(event: &Event) -> &'static str {
    match event {
        Event::Queued { .. } => "queued",
        Event::StateChanged { .. } => "state_changed",
        Event::Finished { .. } => "finished",
        Event::Evicted { .. } => "evicted",
        Event::Uploaded { .. } => "uploaded",
        Event::Shutdown => "shutdown",
    }
}
