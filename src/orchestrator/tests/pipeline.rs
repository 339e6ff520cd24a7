use crate::engine::{NoOpEngine, PassthroughDistributor};
use crate::orchestrator::test_helpers::{
    FailingDistributor, FailingEngine, ScriptedEngine, SlowEngine, create_test_orchestrator,
    create_test_orchestrator_with, wait_for_terminal,
};
use crate::types::{Event, TaskState, UploadId};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn staged_upload_flows_through_engine_and_distribution() {
    let engine = Arc::new(ScriptedEngine::new(&[("out.txt", b"done")]));
    let (orchestrator, _temp_dir) = create_test_orchestrator(engine).await;

    let upload = orchestrator
        .stage_upload(None, "a.txt", b"hi".to_vec(), false)
        .await
        .unwrap();
    let job = format!(r#"{{"report": "weekly", "uploadGuids": ["{upload}"]}}"#);
    let id = orchestrator.submit(&job, None).await.unwrap();

    let view = wait_for_terminal(&orchestrator, id).await;

    assert_eq!(view.state, TaskState::Succeeded, "message: {:?}", view.message);
    assert!(view.completed_at.is_some());
    assert_eq!(view.results.len(), 1);
    assert_eq!(view.results[0].name, "out.txt");
    assert_eq!(view.results[0].data.as_deref(), Some(&b"done"[..]));
    assert_eq!(view.results[0].size_bytes, Some(4));
    let distribution = view.distribution.unwrap();
    assert_eq!(distribution["artifacts"][0]["name"], "out.txt");

    let work_dir = orchestrator.staging().dir_for(id);
    assert_eq!(std::fs::read(work_dir.join("a.txt")).unwrap(), b"hi");
    assert_eq!(std::fs::read_to_string(work_dir.join("job.json")).unwrap(), job);
}

#[tokio::test]
async fn missing_upload_area_is_tolerated() {
    let engine = Arc::new(ScriptedEngine::new(&[("out.txt", b"done")]));
    let (orchestrator, _temp_dir) = create_test_orchestrator(engine).await;

    let job = format!(r#"{{"uploadGuids": ["{}"]}}"#, UploadId::new());
    let id = orchestrator.submit(&job, None).await.unwrap();

    let view = wait_for_terminal(&orchestrator, id).await;
    assert_eq!(view.state, TaskState::Succeeded);
}

#[tokio::test]
async fn engine_failure_is_recorded_on_the_task() {
    let (orchestrator, _temp_dir) =
        create_test_orchestrator(Arc::new(FailingEngine("template not found"))).await;

    let id = orchestrator.submit("{}", None).await.unwrap();
    let view = wait_for_terminal(&orchestrator, id).await;

    assert_eq!(view.state, TaskState::Failed);
    assert!(
        view.message.as_deref().unwrap().contains("template not found"),
        "{:?}",
        view.message
    );
    assert!(view.results.is_empty());
    assert_eq!(orchestrator.live_count(), 0);
}

#[tokio::test]
async fn distribution_failure_keeps_partial_results() {
    let (orchestrator, _temp_dir) = create_test_orchestrator_with(
        Arc::new(ScriptedEngine::new(&[("out.txt", b"done")])),
        Arc::new(FailingDistributor("mail server unreachable")),
        |_| {},
    )
    .await;

    let id = orchestrator.submit("{}", None).await.unwrap();
    let view = wait_for_terminal(&orchestrator, id).await;

    assert_eq!(view.state, TaskState::Failed);
    assert!(view.message.unwrap().contains("mail server unreachable"));
    assert_eq!(view.results.len(), 1);
    assert!(view.distribution.is_none());
}

#[tokio::test]
async fn engine_timeout_fails_the_task() {
    let engine = Arc::new(SlowEngine::new(Duration::from_secs(60)));
    let (orchestrator, _temp_dir) = create_test_orchestrator_with(
        engine,
        Arc::new(PassthroughDistributor),
        |config| config.execution.engine_timeout = Some(Duration::from_millis(100)),
    )
    .await;

    let id = orchestrator.submit("{}", None).await.unwrap();
    let view = wait_for_terminal(&orchestrator, id).await;

    assert_eq!(view.state, TaskState::Failed);
    assert!(view.message.unwrap().contains("timed out"));
}

#[tokio::test]
async fn result_bytes_are_not_embedded_when_disabled() {
    let (orchestrator, _temp_dir) = create_test_orchestrator_with(
        Arc::new(ScriptedEngine::new(&[("out.txt", b"done")])),
        Arc::new(PassthroughDistributor),
        |config| config.execution.embed_result_data = false,
    )
    .await;

    let id = orchestrator.submit("{}", None).await.unwrap();
    let view = wait_for_terminal(&orchestrator, id).await;

    assert_eq!(view.state, TaskState::Succeeded);
    assert!(view.results[0].data.is_none());
    assert_eq!(view.results[0].size_bytes, Some(4));
}

#[tokio::test]
async fn without_an_engine_tasks_fail_as_not_supported() {
    let (orchestrator, _temp_dir) = create_test_orchestrator(Arc::new(NoOpEngine)).await;

    let id = orchestrator.submit("{}", None).await.unwrap();
    let view = wait_for_terminal(&orchestrator, id).await;

    assert_eq!(view.state, TaskState::Failed);
    assert!(view.message.unwrap().contains("not supported"));
}

#[tokio::test]
async fn lifecycle_events_follow_the_state_order() {
    let engine = Arc::new(ScriptedEngine::new(&[("out.txt", b"done")]));
    let (orchestrator, _temp_dir) = create_test_orchestrator(engine).await;
    let mut events = orchestrator.subscribe();

    let id = orchestrator.submit("{}", None).await.unwrap();
    wait_for_terminal(&orchestrator, id).await;

    let mut states = Vec::new();
    while let Ok(Ok(event)) =
        tokio::time::timeout(Duration::from_millis(200), events.recv()).await
    {
        match event {
            Event::StateChanged { id: task, state } if task == id => states.push(state),
            Event::Finished { id: task, state, .. } if task == id => {
                states.push(state);
                break;
            }
            _ => {}
        }
    }

    assert_eq!(
        states,
        vec![
            TaskState::Staging,
            TaskState::Running,
            TaskState::Distributing,
            TaskState::Succeeded
        ]
    );
}
