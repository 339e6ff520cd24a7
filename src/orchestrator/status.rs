//! Status views and health.

use crate::error::{Error, Result};
use crate::types::{Health, TaskId, TaskState, TaskStatusView};
use std::sync::atomic::Ordering;

use super::TaskOrchestrator;

impl TaskOrchestrator {
    /// Status of one task
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the task is unknown or was evicted.
    pub async fn status_of(&self, id: TaskId) -> Result<TaskStatusView> {
        let handle = self
            .registry
            .get(id)
            .await
            .ok_or_else(|| Error::NotFound(format!("task {}", id)))?;
        Ok(handle.view().await)
    }

    /// Status of every registered task, oldest first
    ///
    /// With `state`, only tasks currently in that state are returned.
    pub async fn all_statuses(&self, state: Option<TaskState>) -> Vec<TaskStatusView> {
        let mut views = Vec::new();
        for handle in self.registry.snapshot().await {
            let view = handle.view().await;
            if state.is_none_or(|s| s == view.state) {
                views.push(view);
            }
        }
        views.sort_by_key(|v| v.created_at);
        views
    }

    /// Number of tasks queued or executing
    pub fn live_count(&self) -> usize {
        self.queue_state.live_count.load(Ordering::SeqCst)
    }

    /// Health derived from the live-task counter
    pub fn health(&self) -> Health {
        Health::from_count(self.live_count())
    }
}
