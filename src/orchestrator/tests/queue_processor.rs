use crate::orchestrator::test_helpers::{SlowEngine, create_test_orchestrator, wait_for_terminal};
use crate::types::TaskState;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

#[tokio::test]
async fn worker_pool_bounds_concurrent_engine_runs() {
    let engine = Arc::new(SlowEngine::new(Duration::from_millis(100)));
    let (orchestrator, _temp_dir) = create_test_orchestrator(engine.clone()).await;
    let limit = orchestrator.get_config().execution.max_concurrent_tasks;

    let mut ids = Vec::new();
    for _ in 0..6 {
        ids.push(orchestrator.submit("{}", None).await.unwrap());
    }
    for id in ids {
        assert_eq!(
            wait_for_terminal(&orchestrator, id).await.state,
            TaskState::Succeeded
        );
    }

    assert_eq!(engine.started(), 6);
    let max_running = engine.max_running.load(Ordering::SeqCst);
    assert!(max_running <= limit, "{max_running} engines ran at once");
    assert!(max_running >= 1);
}

#[tokio::test]
async fn health_tracks_live_tasks() {
    let engine = Arc::new(SlowEngine::new(Duration::from_millis(200)));
    let (orchestrator, _temp_dir) = create_test_orchestrator(engine).await;
    assert_eq!(orchestrator.health().to_string(), "ready");

    let first = orchestrator.submit("{}", None).await.unwrap();
    let second = orchestrator.submit("{}", None).await.unwrap();
    assert_eq!(orchestrator.health().to_string(), "running (2)");

    wait_for_terminal(&orchestrator, first).await;
    wait_for_terminal(&orchestrator, second).await;
    crate::orchestrator::test_helpers::wait_until(|| orchestrator.live_count() == 0).await;
    assert_eq!(orchestrator.health().to_string(), "ready");
}
