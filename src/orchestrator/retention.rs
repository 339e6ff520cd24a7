//! Eviction of finished tasks from the registry.

use crate::types::{Event, TaskId};

use super::TaskOrchestrator;

impl TaskOrchestrator {
    /// Evict tasks that finished longer than the retention window ago
    ///
    /// Only the in-memory handle is dropped; working directories stay on
    /// disk until they are deleted explicitly. Returns the evicted ids.
    pub async fn cleanup(&self) -> Vec<TaskId> {
        let evicted = self
            .registry
            .evict_finished(self.config.execution.retention)
            .await;

        for id in &evicted {
            tracing::debug!(task_id = %id, "evicted finished task");
            self.emit_event(Event::Evicted { id: *id });
        }
        evicted
    }

    /// Run [`cleanup`](Self::cleanup) on the configured interval until shutdown
    pub(crate) fn start_retention_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let orchestrator = self.clone();
        let stop = self.queue_state.background_token.clone();
        let period = self.config.execution.cleanup_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => {
                        orchestrator.cleanup().await;
                    }
                }
            }
            tracing::debug!("retention sweeper stopped");
        })
    }
}
