//! Shutdown coordination.

use crate::error::Result;
use crate::types::Event;
use std::sync::atomic::Ordering;
use std::time::Duration;

use super::TaskOrchestrator;

/// Upper bound for waiting on running pipelines during shutdown
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Poll interval while waiting for pipelines to finish
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

impl TaskOrchestrator {
    /// Gracefully shut down the orchestrator
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new submissions
    /// 2. Cancels every unfinished task
    /// 3. Waits for the pipelines to reach a terminal state (30 second timeout)
    /// 4. Stops the queue processor and the retention sweeper
    /// 5. Emits `Event::Shutdown`
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("initiating graceful shutdown");

        self.queue_state.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("stopped accepting new tasks");

        let signalled = self.cancel_all().await;
        tracing::info!(signalled, "signalled cancellation to unfinished tasks");

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.wait_for_unfinished_tasks()).await {
            Ok(()) => tracing::info!("all tasks finished"),
            Err(_) => {
                tracing::warn!("timeout waiting for tasks to finish, proceeding with shutdown")
            }
        }

        self.queue_state.background_token.cancel();
        self.emit_event(Event::Shutdown);

        tracing::info!("graceful shutdown complete");
        Ok(())
    }

    /// Whether new submissions are accepted
    pub fn is_accepting(&self) -> bool {
        self.queue_state.accepting_new.load(Ordering::SeqCst)
    }

    async fn wait_for_unfinished_tasks(&self) {
        loop {
            let mut unfinished = 0;
            for handle in self.registry.snapshot().await {
                if !handle.state().await.is_terminal() {
                    unfinished += 1;
                }
            }

            if unfinished == 0 {
                return;
            }

            tracing::debug!(unfinished, "waiting for tasks to finish");
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
    }
}
