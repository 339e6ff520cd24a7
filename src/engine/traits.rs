//! Collaborator traits for the processing engine and the distribution step

use crate::job::JobDescription;
use crate::types::{DistributionOutcome, JobResult, TaskId};
use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// The external processing engine
///
/// Turns a job description and the staged inputs in `work_dir` into output
/// artifacts written below `work_dir`. Implementations must watch `cancel`
/// and return promptly once it fires, either with `Error::Cancelled` or with
/// whatever partial results they have.
///
/// Relative [`JobResult::path`] values are resolved against `work_dir`.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Run one job to completion
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The engine could not be started (`ExternalTool`, `NotSupported`)
    /// - The engine reported a failure (`Engine`)
    /// - Cancellation was observed (`Cancelled`)
    async fn run(
        &self,
        job: &JobDescription,
        task_id: TaskId,
        work_dir: &Path,
        cancel: CancellationToken,
    ) -> crate::Result<Vec<JobResult>>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// The external distribution step
///
/// Delivers or publishes the artifacts produced by the engine and returns an
/// opaque descriptor of what it did.
#[async_trait]
pub trait Distributor: Send + Sync {
    /// Distribute the results of one task
    ///
    /// # Errors
    ///
    /// Returns `Distribution` when delivery fails and `Cancelled` when
    /// cancellation was observed.
    async fn distribute(
        &self,
        results: &[JobResult],
        cancel: CancellationToken,
    ) -> crate::Result<DistributionOutcome>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
