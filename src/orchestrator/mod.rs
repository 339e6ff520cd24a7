//! Task orchestration split into focused submodules.
//!
//! The `TaskOrchestrator` struct and its methods are organized by concern:
//! - [`submit`] - Job ingestion and task creation
//! - [`queue_processor`] - Bounded worker pool feeding the pipeline
//! - [`pipeline`] - Per-task execution (staging, engine, distribution)
//! - [`control`] - Cancellation
//! - [`status`] - Status views and health
//! - [`retention`] - Eviction of finished tasks
//! - [`files`] - Upload staging and result download
//! - [`lifecycle`] - Shutdown coordination

mod control;
mod files;
mod lifecycle;
mod pipeline;
mod queue_processor;
mod retention;
mod status;
mod submit;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::engine::{Distributor, Engine, PassthroughDistributor, engine_from_config};
use crate::error::Result;
use crate::job::JobDescription;
use crate::registry::{TaskHandle, TaskRegistry};
use crate::staging::StagingStore;
use crate::types::Event;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{Semaphore, broadcast, mpsc};
use tokio_util::sync::CancellationToken;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// A submitted task waiting for a worker slot
pub(crate) struct QueuedTask {
    pub(crate) handle: Arc<TaskHandle>,
    pub(crate) job: JobDescription,
}

/// Submission queue and worker pool state
#[derive(Clone)]
pub(crate) struct QueueState {
    /// Bounded submission queue (capacity = queue_capacity)
    pub(crate) submit_tx: mpsc::Sender<QueuedTask>,
    /// Limits concurrently running pipelines (max_concurrent_tasks permits)
    pub(crate) concurrent_limit: Arc<Semaphore>,
    /// Tasks submitted and not yet finished or cancelled
    pub(crate) live_count: Arc<AtomicUsize>,
    /// Cleared during shutdown
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Stops the queue processor and the retention sweeper
    pub(crate) background_token: CancellationToken,
}

/// Task orchestrator (cloneable - all fields are Arc-wrapped)
///
/// Owns the registry, the staging store and the worker pool. Construct one
/// per process and share it with the request layer.
#[derive(Clone)]
pub struct TaskOrchestrator {
    /// Configuration
    pub(crate) config: Arc<Config>,
    /// Upload areas and task working directories
    pub(crate) staging: Arc<StagingStore>,
    /// Every known task
    pub(crate) registry: Arc<TaskRegistry>,
    /// External processing engine
    pub(crate) engine: Arc<dyn Engine>,
    /// External distribution step
    pub(crate) distributor: Arc<dyn Distributor>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Submission queue and worker pool state
    pub(crate) queue_state: QueueState,
}

impl TaskOrchestrator {
    /// Create an orchestrator with the collaborators described by `config`
    ///
    /// Uses [`engine_from_config`] for the engine and a
    /// [`PassthroughDistributor`].
    pub async fn new(config: Config) -> Result<Self> {
        let engine = engine_from_config(&config);
        Self::with_collaborators(config, engine, Arc::new(PassthroughDistributor)).await
    }

    /// Create an orchestrator with explicit engine and distributor
    ///
    /// Validates the configuration, creates the staging root and starts the
    /// queue processor and the retention sweeper.
    pub async fn with_collaborators(
        config: Config,
        engine: Arc<dyn Engine>,
        distributor: Arc<dyn Distributor>,
    ) -> Result<Self> {
        config.validate()?;

        let staging = Arc::new(StagingStore::new(config.staging.root_dir.clone()));
        staging.ensure_root().await?;

        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (submit_tx, submit_rx) = mpsc::channel(config.execution.queue_capacity);

        let queue_state = QueueState {
            submit_tx,
            concurrent_limit: Arc::new(Semaphore::new(config.execution.max_concurrent_tasks)),
            live_count: Arc::new(AtomicUsize::new(0)),
            accepting_new: Arc::new(AtomicBool::new(true)),
            background_token: CancellationToken::new(),
        };

        tracing::info!(
            engine = engine.name(),
            distributor = distributor.name(),
            root = ?config.staging.root_dir,
            max_concurrent_tasks = config.execution.max_concurrent_tasks,
            "task orchestrator initialized"
        );

        let orchestrator = Self {
            config: Arc::new(config),
            staging,
            registry: Arc::new(TaskRegistry::new()),
            engine,
            distributor,
            event_tx,
            queue_state,
        };

        orchestrator.start_queue_processor(submit_rx);
        orchestrator.start_retention_sweeper();

        Ok(orchestrator)
    }

    /// Subscribe to task events
    ///
    /// Each subscriber receives every event independently. A subscriber that
    /// falls more than 1000 events behind receives `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// The staging store backing uploads and working directories
    pub fn staging(&self) -> &StagingStore {
        &self.staging
    }

    /// Emit an event to all subscribers (dropped when nobody listens)
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Release the live slot held by a task, at most once per task
    pub(crate) fn release_live_slot(&self, handle: &TaskHandle) {
        if handle.release_live() {
            self.queue_state.live_count.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Spawn the REST API server in a background task
    ///
    /// Listens on the configured bind address (default: 127.0.0.1:11271).
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let orchestrator = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(orchestrator, config).await })
    }
}
