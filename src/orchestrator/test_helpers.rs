//! Shared test helpers: orchestrators over temp roots and stub collaborators.

use crate::config::Config;
use crate::engine::{Distributor, Engine, PassthroughDistributor};
use crate::job::JobDescription;
use crate::orchestrator::TaskOrchestrator;
use crate::types::{DistributionOutcome, JobResult, TaskId, TaskStatusView};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::{TempDir, tempdir};
use tokio_util::sync::CancellationToken;

/// Longest a test waits for a task to reach a terminal state
pub(crate) const TERMINAL_WAIT: Duration = Duration::from_secs(5);

/// Config rooted in `root` with a retention long enough for status checks
pub(crate) fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.staging.root_dir = root.join("staging");
    config.execution.max_concurrent_tasks = 2;
    config.execution.queue_capacity = 16;
    config.execution.retention = Duration::from_secs(60);
    config
}

/// Orchestrator with the given engine and a passthrough distributor.
/// Returns the orchestrator and the tempdir (which must be kept alive).
pub(crate) async fn create_test_orchestrator(
    engine: Arc<dyn Engine>,
) -> (TaskOrchestrator, TempDir) {
    create_test_orchestrator_with(engine, Arc::new(PassthroughDistributor), |_| {}).await
}

/// Orchestrator with explicit collaborators and config tweaks
pub(crate) async fn create_test_orchestrator_with(
    engine: Arc<dyn Engine>,
    distributor: Arc<dyn Distributor>,
    tweak: impl FnOnce(&mut Config),
) -> (TaskOrchestrator, TempDir) {
    let temp_dir = tempdir().unwrap();
    let mut config = test_config(temp_dir.path());
    tweak(&mut config);

    let orchestrator = TaskOrchestrator::with_collaborators(config, engine, distributor)
        .await
        .unwrap();
    (orchestrator, temp_dir)
}

/// Poll until the task is terminal, panicking after [`TERMINAL_WAIT`]
pub(crate) async fn wait_for_terminal(orchestrator: &TaskOrchestrator, id: TaskId) -> TaskStatusView {
    tokio::time::timeout(TERMINAL_WAIT, async {
        loop {
            let view = orchestrator.status_of(id).await.unwrap();
            if view.state.is_terminal() {
                return view;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("task did not reach a terminal state in time")
}

/// Poll until `check` holds, panicking after [`TERMINAL_WAIT`]
pub(crate) async fn wait_until(mut check: impl FnMut() -> bool) {
    tokio::time::timeout(TERMINAL_WAIT, async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time")
}

/// Engine that writes fixed output files into the working directory
pub(crate) struct ScriptedEngine {
    outputs: Vec<(String, Vec<u8>)>,
    pub(crate) calls: AtomicUsize,
}

impl ScriptedEngine {
    pub(crate) fn new(outputs: &[(&str, &[u8])]) -> Self {
        Self {
            outputs: outputs
                .iter()
                .map(|(name, bytes)| (name.to_string(), bytes.to_vec()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Engine for ScriptedEngine {
    async fn run(
        &self,
        _job: &JobDescription,
        _task_id: TaskId,
        work_dir: &Path,
        _cancel: CancellationToken,
    ) -> crate::Result<Vec<JobResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut results = Vec::new();
        for (name, bytes) in &self.outputs {
            tokio::fs::write(work_dir.join(name), bytes).await?;
            results.push(JobResult::from_path(name));
        }
        Ok(results)
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Engine that runs until cancelled or until `delay` has passed
pub(crate) struct SlowEngine {
    delay: Duration,
    pub(crate) started: AtomicUsize,
    running: AtomicUsize,
    pub(crate) max_running: AtomicUsize,
}

impl SlowEngine {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            max_running: AtomicUsize::new(0),
        }
    }

    pub(crate) fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Engine for SlowEngine {
    async fn run(
        &self,
        _job: &JobDescription,
        _task_id: TaskId,
        _work_dir: &Path,
        cancel: CancellationToken,
    ) -> crate::Result<Vec<JobResult>> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let now_running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now_running, Ordering::SeqCst);

        let result = tokio::select! {
            _ = tokio::time::sleep(self.delay) => Ok(Vec::new()),
            _ = cancel.cancelled() => Err(crate::Error::Cancelled),
        };

        self.running.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}

/// Engine that always fails with the given message
pub(crate) struct FailingEngine(pub(crate) &'static str);

#[async_trait]
impl Engine for FailingEngine {
    async fn run(
        &self,
        _job: &JobDescription,
        _task_id: TaskId,
        _work_dir: &Path,
        _cancel: CancellationToken,
    ) -> crate::Result<Vec<JobResult>> {
        Err(crate::Error::Engine(self.0.to_string()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Distributor that always fails with the given message
pub(crate) struct FailingDistributor(pub(crate) &'static str);

#[async_trait]
impl Distributor for FailingDistributor {
    async fn distribute(
        &self,
        _results: &[JobResult],
        _cancel: CancellationToken,
    ) -> crate::Result<DistributionOutcome> {
        Err(crate::Error::Distribution(self.0.to_string()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Distributor that runs until cancelled or until `delay` has passed
pub(crate) struct SlowDistributor {
    delay: Duration,
    pub(crate) started: AtomicUsize,
}

impl SlowDistributor {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: AtomicUsize::new(0),
        }
    }

    pub(crate) fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Distributor for SlowDistributor {
    async fn distribute(
        &self,
        results: &[JobResult],
        cancel: CancellationToken,
    ) -> crate::Result<DistributionOutcome> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::select! {
            _ = tokio::time::sleep(self.delay) => Ok(serde_json::json!({ "delivered": results.len() })),
            _ = cancel.cancelled() => Err(crate::Error::Cancelled),
        }
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}
