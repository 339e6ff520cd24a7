//! Task cancellation.

use crate::error::{Error, Result};
use crate::registry::TaskHandle;
use crate::types::{Event, TaskId, TaskState};

use super::TaskOrchestrator;

/// Status message set when cancellation is requested
const CANCEL_REQUESTED: &str = "cancellation requested";

impl TaskOrchestrator {
    /// Request cancellation of one task
    ///
    /// A task still waiting in the queue ends `Cancelled` right away. For a
    /// task that has started, cancellation is cooperative: the task's token is
    /// signalled and the pipeline moves the task to `Cancelled` once the engine
    /// or distributor observes it. Either way the task's live slot is released
    /// immediately. Cancelling a task that already finished does nothing.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no task is registered under `id`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use jobhost::*;
    /// # async fn example(orchestrator: TaskOrchestrator, id: TaskId) -> Result<()> {
    /// orchestrator.cancel(id).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn cancel(&self, id: TaskId) -> Result<()> {
        let handle = self
            .registry
            .get(id)
            .await
            .ok_or_else(|| Error::NotFound(format!("task {}", id)))?;

        if handle.state().await.is_terminal() {
            tracing::debug!(task_id = %id, "cancel ignored, task already finished");
            return Ok(());
        }

        self.signal_cancel(&handle).await;
        tracing::info!(task_id = %id, "cancellation requested");
        Ok(())
    }

    /// Request cancellation of every unfinished task
    ///
    /// Also releases the live slot of each of those tasks, so the live-task
    /// counter drops to zero immediately. Returns the number of tasks signalled.
    pub async fn cancel_all(&self) -> usize {
        let mut signalled = 0;
        for handle in self.registry.snapshot().await {
            if handle.state().await.is_terminal() {
                continue;
            }
            self.signal_cancel(&handle).await;
            signalled += 1;
        }

        tracing::info!(signalled, "cancellation requested for all tasks");
        signalled
    }

    async fn signal_cancel(&self, handle: &TaskHandle) {
        handle.set_message(CANCEL_REQUESTED).await;
        handle.cancel_token().cancel();

        // Still waiting for a worker slot
        if handle.cancel_if_queued("cancelled").await {
            tracing::info!(task_id = %handle.id(), "queued task cancelled");
            self.emit_event(Event::Finished {
                id: handle.id(),
                state: TaskState::Cancelled,
                message: Some("cancelled".to_string()),
            });
        }

        self.release_live_slot(handle);
    }
}
