//! REST API server module
//!
//! Thin HTTP surface over [`TaskOrchestrator`]: job submission, status,
//! cancellation, upload staging and result download.

use crate::{Config, Result, TaskOrchestrator};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error_response;
pub mod routes;
pub mod state;

pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Tasks
/// - `POST /task` - Submit a job (body is the job JSON), returns `201 {"id"}`
/// - `POST /task/:id` - Submit a job under a caller-chosen id
/// - `DELETE /task` - Cancel every unfinished task
/// - `DELETE /task/:id` - Cancel one task
///
/// ## Status
/// - `GET /status/all` - Status of every task (`?state=` filters)
/// - `GET /status/:id` - Status of one task
///
/// ## Files
/// - `POST /file` - Stage an upload (`filename`, `unzip` as header or query)
/// - `POST /file/:id` - Stage an upload into a given upload area
/// - `GET /file/:id` - Download a named file, or a ZIP of the directory
/// - `DELETE /file` - Remove every directory under the staging root
/// - `DELETE /file/:id` - Remove one directory
///
/// ## System
/// - `GET /health` - `ready` or `running (n)` as text/plain
/// - `GET /events` - Server-sent events stream
pub fn create_router(orchestrator: Arc<TaskOrchestrator>, config: Arc<Config>) -> Router {
    let state = AppState::new(orchestrator, config.clone());

    let router = Router::new()
        // Tasks
        .route(
            "/task",
            post(routes::submit_task).delete(routes::cancel_all_tasks),
        )
        .route(
            "/task/:id",
            post(routes::submit_task_with_id).delete(routes::cancel_task),
        )
        // Status
        .route("/status/all", get(routes::list_statuses))
        .route("/status/:id", get(routes::get_status))
        // Files
        .route(
            "/file",
            post(routes::upload_file).delete(routes::delete_all_files),
        )
        .route(
            "/file/:id",
            post(routes::upload_file_with_id)
                .get(routes::download_file)
                .delete(routes::delete_files),
        )
        // System
        .route("/health", get(routes::health_check))
        .route("/events", get(routes::event_stream))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.server.api.max_body_bytes))
        .layer(TraceLayer::new_for_http());

    if config.server.api.cors_enabled {
        let cors = build_cors_layer(&config.server.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin. All methods and headers are
/// allowed.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the server stops. Use [`start_api_server_with_shutdown`] to
/// stop it from a signal.
///
/// # Example
///
/// ```no_run
/// use jobhost::{Config, TaskOrchestrator};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let orchestrator = Arc::new(TaskOrchestrator::new((*config).clone()).await?);
///
/// jobhost::api::start_api_server(orchestrator, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(orchestrator: Arc<TaskOrchestrator>, config: Arc<Config>) -> Result<()> {
    start_api_server_with_shutdown(orchestrator, config, std::future::pending()).await
}

/// Start the API server and stop accepting connections once `shutdown` completes
pub async fn start_api_server_with_shutdown(
    orchestrator: Arc<TaskOrchestrator>,
    config: Arc<Config>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let bind_address = config.server.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(orchestrator, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %listener.local_addr().unwrap_or(bind_address),
        "API server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
