//! Job ingestion and task creation.

use crate::error::{Error, Result};
use crate::job::JobDescription;
use crate::registry::TaskHandle;
use crate::types::{Event, TaskId};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::mpsc::error::TrySendError;

use super::{QueuedTask, TaskOrchestrator};

impl TaskOrchestrator {
    /// Submit a job and return its task identifier
    ///
    /// Returns as soon as the task is queued; execution happens in the
    /// background and its outcome is only visible through [`status_of`].
    /// Without `task_id` a fresh identifier is generated.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` for an empty or malformed job description
    /// - `TaskAlreadyExists` if a non-terminal task uses `task_id`
    /// - `QueueFull` if the submission queue is at capacity
    /// - `ShuttingDown` once shutdown has started
    ///
    /// No task is left behind when an error is returned.
    ///
    /// [`status_of`]: TaskOrchestrator::status_of
    pub async fn submit(&self, job: &str, task_id: Option<TaskId>) -> Result<TaskId> {
        if !self.queue_state.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let job = JobDescription::parse(job)?;
        let id = task_id.unwrap_or_default();
        let uploads = job.upload_ids().len();

        let handle = Arc::new(TaskHandle::new(id));
        self.registry.insert(handle.clone()).await?;
        self.queue_state.live_count.fetch_add(1, Ordering::SeqCst);

        let queued = QueuedTask {
            handle: handle.clone(),
            job,
        };
        if let Err(e) = self.queue_state.submit_tx.try_send(queued) {
            self.registry.remove(id).await;
            self.release_live_slot(&handle);
            return Err(match e {
                TrySendError::Full(_) => {
                    tracing::warn!(task_id = %id, "submission queue full, rejecting task");
                    Error::QueueFull {
                        capacity: self.config.execution.queue_capacity,
                    }
                }
                TrySendError::Closed(_) => Error::ShuttingDown,
            });
        }

        tracing::info!(task_id = %id, uploads, "task queued");
        self.emit_event(Event::Queued { id });

        Ok(id)
    }
}

