//! Custom test assertions for integration tests

use jobhost::{TaskId, TaskOrchestrator, TaskStatusView};
use std::time::Duration;

/// Poll `status_of` until the task is terminal or `timeout` elapses
///
/// Returns `None` on timeout.
pub async fn wait_for_terminal(
    orchestrator: &TaskOrchestrator,
    id: TaskId,
    timeout: Duration,
) -> Option<TaskStatusView> {
    tokio::time::timeout(timeout, async {
        loop {
            match orchestrator.status_of(id).await {
                Ok(view) if view.state.is_terminal() => return view,
                Ok(_) => tokio::time::sleep(Duration::from_millis(10)).await,
                Err(e) => panic!("task {id} vanished while waiting: {e}"),
            }
        }
    })
    .await
    .ok()
}

/// Poll until `check` holds, returning whether it did within `timeout`
pub async fn eventually(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    tokio::time::timeout(timeout, async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .is_ok()
}
