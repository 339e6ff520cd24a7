//! Per-task execution: staging, engine, distribution, completion.

use crate::error::{Error, Result, StagingError};
use crate::job::JobDescription;
use crate::registry::TaskHandle;
use crate::types::{Event, JobResult, TaskState};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use super::{QueuedTask, TaskOrchestrator};

impl TaskOrchestrator {
    /// Drive one task from `Queued` to a terminal state
    ///
    /// Errors never leave this function: they become the task's terminal
    /// state and message. The live slot is always released and a retention
    /// pass always runs afterwards.
    pub(crate) async fn run_task(&self, task: QueuedTask) {
        let QueuedTask { handle, job } = task;
        let id = handle.id();
        let cancel = handle.cancel_token().clone();

        let outcome = self.execute(&handle, &job, &cancel).await;

        let (state, message) = match outcome {
            Ok(()) => (TaskState::Succeeded, None),
            Err(Error::Cancelled) => (TaskState::Cancelled, Some("cancelled".to_string())),
            Err(e) if cancel.is_cancelled() => {
                tracing::debug!(task_id = %id, error = %e, "error after cancellation");
                (TaskState::Cancelled, Some("cancelled".to_string()))
            }
            Err(e) => (TaskState::Failed, Some(e.to_string())),
        };

        if handle.transition(state, message.clone()).await {
            match state {
                TaskState::Failed => {
                    tracing::error!(task_id = %id, error = ?message, "task failed")
                }
                _ => tracing::info!(task_id = %id, %state, "task finished"),
            }
            self.emit_event(Event::Finished { id, state, message });
        }

        self.release_live_slot(&handle);
        self.cleanup().await;
    }

    async fn execute(
        &self,
        handle: &TaskHandle,
        job: &JobDescription,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let id = handle.id();
        ensure_not_cancelled(cancel)?;

        // Staging
        self.advance(handle, TaskState::Staging).await;
        let work_dir = self.staging.create_dir_for(id).await?;
        self.write_job_file(&work_dir, job).await?;
        for upload_id in job.upload_ids() {
            match self.staging.copy_into(*upload_id, &work_dir).await {
                Ok(files) => {
                    tracing::debug!(task_id = %id, upload_id = %upload_id, files, "seeded working directory")
                }
                Err(Error::NotFound(_)) => {
                    tracing::warn!(task_id = %id, upload_id = %upload_id, "referenced upload area does not exist")
                }
                Err(e) => return Err(e),
            }
        }
        ensure_not_cancelled(cancel)?;

        // Running
        self.advance(handle, TaskState::Running).await;
        let reported = self.invoke_engine(handle, job, &work_dir, cancel).await?;
        ensure_not_cancelled(cancel)?;

        let results = self.collect_results(&work_dir, reported).await;
        handle.set_results(results.clone()).await;

        // Distributing
        self.advance(handle, TaskState::Distributing).await;
        let outcome = self.distributor.distribute(&results, cancel.clone()).await?;
        ensure_not_cancelled(cancel)?;
        handle.set_distribution(outcome).await;

        Ok(())
    }

    async fn advance(&self, handle: &TaskHandle, state: TaskState) {
        if handle.transition(state, None).await {
            tracing::info!(task_id = %handle.id(), %state, "task state changed");
            self.emit_event(Event::StateChanged {
                id: handle.id(),
                state,
            });
        }
    }

    async fn write_job_file(&self, work_dir: &Path, job: &JobDescription) -> Result<()> {
        let path = work_dir.join(&self.config.staging.job_file_name);
        tokio::fs::write(&path, job.raw())
            .await
            .map_err(|e| StagingError::WriteFailed {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    /// Run the engine under a child token so a timeout can stop it without
    /// marking the task cancelled
    async fn invoke_engine(
        &self,
        handle: &TaskHandle,
        job: &JobDescription,
        work_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<Vec<JobResult>> {
        let engine_cancel = cancel.child_token();
        let run = self
            .engine
            .run(job, handle.id(), work_dir, engine_cancel.clone());

        let Some(limit) = self.config.execution.engine_timeout else {
            return run.await;
        };

        tokio::pin!(run);
        match tokio::time::timeout(limit, &mut run).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(task_id = %handle.id(), timeout_secs = limit.as_secs(), "engine timed out");
                engine_cancel.cancel();
                // Let the engine unwind cooperatively before reporting
                let _ = run.await;
                Err(Error::Engine(format!(
                    "engine timed out after {}s",
                    limit.as_secs()
                )))
            }
        }
    }

    /// Fill in sizes and, when configured, file content for each reported artifact
    async fn collect_results(&self, work_dir: &Path, reported: Vec<JobResult>) -> Vec<JobResult> {
        let embed = self.config.execution.embed_result_data;
        let mut results = Vec::with_capacity(reported.len());

        for mut result in reported {
            let location = resolve(work_dir, &result.path);
            if result.size_bytes.is_none() {
                result.size_bytes = tokio::fs::metadata(&location).await.ok().map(|m| m.len());
            }
            if embed && result.data.is_none() {
                match tokio::fs::read(&location).await {
                    Ok(bytes) => result.data = Some(bytes),
                    Err(e) => {
                        tracing::warn!(path = ?location, error = %e, "result artifact not readable")
                    }
                }
            }
            results.push(result);
        }

        results
    }
}

fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(())
}

fn resolve(work_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        work_dir.join(path)
    }
}
