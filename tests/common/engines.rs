//! Stub engines and distributors for driving the pipeline without external tools

use async_trait::async_trait;
use jobhost::{Distributor, Engine, Error, JobDescription, JobResult, Result, TaskId};
use serde_json::json;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Engine that writes `out.txt` containing "done" and reports it
pub struct OutputEngine;

#[async_trait]
impl Engine for OutputEngine {
    async fn run(
        &self,
        _job: &JobDescription,
        _task_id: TaskId,
        work_dir: &Path,
        _cancel: CancellationToken,
    ) -> Result<Vec<JobResult>> {
        tokio::fs::write(work_dir.join("out.txt"), b"done").await?;
        Ok(vec![JobResult::from_path("out.txt")])
    }

    fn name(&self) -> &'static str {
        "output"
    }
}

/// Engine that sleeps for a long time unless cancelled, counting observed cancellations
pub struct SleepyEngine {
    pub delay: Duration,
    pub started: AtomicUsize,
    pub observed_cancel: AtomicUsize,
}

impl SleepyEngine {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: AtomicUsize::new(0),
            observed_cancel: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Engine for SleepyEngine {
    async fn run(
        &self,
        _job: &JobDescription,
        _task_id: TaskId,
        _work_dir: &Path,
        cancel: CancellationToken,
    ) -> Result<Vec<JobResult>> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::select! {
            _ = tokio::time::sleep(self.delay) => Ok(Vec::new()),
            _ = cancel.cancelled() => {
                self.observed_cancel.fetch_add(1, Ordering::SeqCst);
                Err(Error::Cancelled)
            }
        }
    }

    fn name(&self) -> &'static str {
        "sleepy"
    }
}

/// Distributor that records the artifact names it was handed
#[derive(Default)]
pub struct RecordingDistributor {
    pub seen: Mutex<Vec<String>>,
}

#[async_trait]
impl Distributor for RecordingDistributor {
    async fn distribute(
        &self,
        results: &[JobResult],
        _cancel: CancellationToken,
    ) -> Result<serde_json::Value> {
        let names: Vec<String> = results.iter().map(|r| r.name.clone()).collect();
        self.seen
            .lock()
            .expect("recording lock poisoned")
            .extend(names.iter().cloned());
        Ok(json!({ "delivered": names }))
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
