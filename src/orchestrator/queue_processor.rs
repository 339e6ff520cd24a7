//! Queue processor — drains the submission queue into the bounded worker pool.

use tokio::sync::mpsc;

use super::{QueuedTask, TaskOrchestrator};

impl TaskOrchestrator {
    /// Start the queue processor task
    ///
    /// Spawns a background task that continuously:
    /// 1. Waits for the next submitted task
    /// 2. Acquires a permit from the concurrency limiter (respects max_concurrent_tasks)
    /// 3. Spawns the task pipeline, which holds the permit until it finishes
    ///
    /// Tasks cancelled while queued are already terminal (see `cancel`); their
    /// pipeline still runs, without a permit, to release what they hold. The
    /// processor stops when the background token fires; tasks still queued at
    /// that point are finalized as cancelled.
    pub(crate) fn start_queue_processor(
        &self,
        mut submit_rx: mpsc::Receiver<QueuedTask>,
    ) -> tokio::task::JoinHandle<()> {
        let concurrent_limit = self.queue_state.concurrent_limit.clone();
        let stop = self.queue_state.background_token.clone();
        let orchestrator = self.clone();

        tokio::spawn(async move {
            loop {
                let task = tokio::select! {
                    _ = stop.cancelled() => break,
                    next = submit_rx.recv() => match next {
                        Some(task) => task,
                        None => break,
                    },
                };

                // Blocks while max_concurrent_tasks pipelines are running
                let cancel = task.handle.cancel_token().clone();
                let permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    _ = stop.cancelled() => {
                        orchestrator.abandon(task).await;
                        break;
                    }
                    permit = concurrent_limit.clone().acquire_owned() => match permit {
                        Ok(p) => Some(p),
                        Err(_) => break,
                    },
                };

                let orchestrator = orchestrator.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    orchestrator.run_task(task).await;
                });
            }

            // Tasks still queued at shutdown end as cancelled
            submit_rx.close();
            while let Ok(task) = submit_rx.try_recv() {
                orchestrator.abandon(task).await;
            }

            tracing::debug!("queue processor stopped");
        })
    }

    async fn abandon(&self, task: QueuedTask) {
        task.handle.cancel_token().cancel();
        self.run_task(task).await;
    }
}
