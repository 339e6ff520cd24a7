use super::*;
use crate::engine::Engine;
use crate::orchestrator::test_helpers::{ScriptedEngine, create_test_orchestrator};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use std::time::Duration;
use tower::ServiceExt;


/// Test orchestrator wrapped in Arc, with a router over it
async fn create_test_app(
    engine: Arc<dyn Engine>,
) -> (Router, Arc<TaskOrchestrator>, tempfile::TempDir) {
    let (orchestrator, temp_dir) = create_test_orchestrator(engine).await;
    let orchestrator = Arc::new(orchestrator);
    let app = create_router(orchestrator.clone(), orchestrator.get_config());
    (app, orchestrator, temp_dir)
}

/// App whose engine writes `out.txt` containing "done"
async fn create_default_app() -> (Router, Arc<TaskOrchestrator>, tempfile::TempDir) {
    create_test_app(Arc::new(ScriptedEngine::new(&[("out.txt", b"done")]))).await
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let (_app, orchestrator, _temp_dir) = create_default_app().await;

    let mut config = (*orchestrator.get_config()).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap(); // Port 0 = OS assigns a free port
    let config = Arc::new(config);

    let api_handle = tokio::spawn({
        let orchestrator = orchestrator.clone();
        let config = config.clone();
        async move { start_api_server(orchestrator, config).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server exited early");
    api_handle.abort();
}

#[tokio::test]
async fn test_server_stops_on_shutdown_signal() {
    let (_app, orchestrator, _temp_dir) = create_default_app().await;

    let mut config = (*orchestrator.get_config()).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let api_handle = tokio::spawn(start_api_server_with_shutdown(
        orchestrator,
        Arc::new(config),
        async move {
            stop_rx.await.ok();
        },
    ));

    tokio::time::sleep(Duration::from_millis(100)).await;
    stop_tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), api_handle)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cors_enabled() {
    let (_app, orchestrator, _temp_dir) = create_default_app().await;

    let mut config = (*orchestrator.get_config()).clone();
    config.server.api.cors_enabled = true;
    config.server.api.cors_origins = vec!["*".to_string()];
    let app = create_router(orchestrator, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (_app, orchestrator, _temp_dir) = create_default_app().await;

    let mut config = (*orchestrator.get_config()).clone();
    config.server.api.cors_enabled = false;
    let app = create_router(orchestrator, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_spawn_api_server_method() {
    let (_app, orchestrator, _temp_dir) = create_default_app().await;

    let api_handle = orchestrator.spawn_api_server();

    tokio::time::sleep(Duration::from_millis(100)).await;
    api_handle.abort();
}
