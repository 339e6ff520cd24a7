//! Stand-in collaborators used when nothing external is configured

use super::traits::{Distributor, Engine};
use crate::job::JobDescription;
use crate::types::{DistributionOutcome, JobResult, TaskId};
use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Engine used when no engine executable is configured
///
/// Every task run through it fails with `Error::NotSupported`, so the service
/// still starts and serves uploads, downloads and status without an engine.
pub struct NoOpEngine;

#[async_trait]
impl Engine for NoOpEngine {
    async fn run(
        &self,
        _job: &JobDescription,
        _task_id: TaskId,
        _work_dir: &Path,
        _cancel: CancellationToken,
    ) -> crate::Result<Vec<JobResult>> {
        Err(crate::Error::NotSupported(
            "no engine configured. \
             Set engine_command in config or pass --engine."
                .into(),
        ))
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

/// Distributor that publishes nothing
///
/// Returns an outcome listing the artifacts it was handed, which is what the
/// status view reports as the distribution result.
pub struct PassthroughDistributor;

#[async_trait]
impl Distributor for PassthroughDistributor {
    async fn distribute(
        &self,
        results: &[JobResult],
        cancel: CancellationToken,
    ) -> crate::Result<DistributionOutcome> {
        if cancel.is_cancelled() {
            return Err(crate::Error::Cancelled);
        }

        let artifacts: Vec<_> = results
            .iter()
            .map(|r| {
                serde_json::json!({
                    "name": r.name,
                    "size_bytes": r.size_bytes,
                })
            })
            .collect();

        Ok(serde_json::json!({
            "distributor": self.name(),
            "artifacts": artifacts,
        }))
    }

    fn name(&self) -> &'static str {
        "passthrough"
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_engine_is_not_supported() {
        let job = JobDescription::parse("{}").unwrap();
        let result = NoOpEngine
            .run(&job, TaskId::new(), Path::new("/tmp"), CancellationToken::new())
            .await;

        assert!(matches!(result, Err(crate::Error::NotSupported(_))));
        assert_eq!(NoOpEngine.name(), "noop");
    }

    #[tokio::test]
    async fn passthrough_lists_artifacts() {
        let mut result = JobResult::from_path("out.txt");
        result.size_bytes = Some(4);

        let outcome = PassthroughDistributor
            .distribute(&[result], CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome["distributor"], "passthrough");
        assert_eq!(outcome["artifacts"][0]["name"], "out.txt");
        assert_eq!(outcome["artifacts"][0]["size_bytes"], 4);
    }

    #[tokio::test]
    async fn passthrough_honors_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = PassthroughDistributor.distribute(&[], cancel).await;

        assert!(matches!(result, Err(crate::Error::Cancelled)));
    }
}
