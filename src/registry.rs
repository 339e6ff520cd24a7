//! Task registry: the in-memory record of every known task
//!
//! The registry maps task identifiers to shared [`TaskHandle`]s. Handles are
//! only mutated by the pipeline that owns the task, plus the cancel path,
//! which touches the message and finalizes tasks that never left the queue.
//! Everything else reads snapshots.

use crate::error::{Error, Result};
use crate::types::{DistributionOutcome, JobResult, TaskId, TaskState, TaskStatusView};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Mutable part of a task handle
#[derive(Debug)]
struct TaskRecord {
    state: TaskState,
    message: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    /// Monotonic completion time, used for retention
    finished_at: Option<Instant>,
    results: Vec<JobResult>,
    distribution: Option<DistributionOutcome>,
}

/// In-memory record of one task
#[derive(Debug)]
pub struct TaskHandle {
    id: TaskId,
    created_at: DateTime<Utc>,
    cancel_token: CancellationToken,
    /// Set while the task counts towards the live-task counter
    live: AtomicBool,
    record: RwLock<TaskRecord>,
}

impl TaskHandle {
    /// Create a `Queued` handle with a fresh cancellation token
    pub fn new(id: TaskId) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            cancel_token: CancellationToken::new(),
            live: AtomicBool::new(true),
            record: RwLock::new(TaskRecord {
                state: TaskState::Queued,
                message: None,
                completed_at: None,
                finished_at: None,
                results: Vec::new(),
                distribution: None,
            }),
        }
    }

    /// Task identifier
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Submission time
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Cancellation token shared with the engine and distributor
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }

    /// Current state
    pub async fn state(&self) -> TaskState {
        self.record.read().await.state
    }

    /// Move to `next` if the lifecycle allows it
    ///
    /// Returns `false` (and changes nothing) for backward moves and for any
    /// move out of a terminal state. Entering a terminal state stamps the
    /// completion time. A `message` replaces the current one.
    pub async fn transition(&self, next: TaskState, message: Option<String>) -> bool {
        let mut record = self.record.write().await;
        if !record.state.can_transition_to(next) {
            return false;
        }
        record.state = next;
        if message.is_some() {
            record.message = message;
        }
        if next.is_terminal() {
            record.completed_at = Some(Utc::now());
            record.finished_at = Some(Instant::now());
        }
        true
    }

    /// Move straight from `Queued` to `Cancelled`
    ///
    /// Returns `false` (and changes nothing) once the pipeline has moved the
    /// task past `Queued`.
    pub async fn cancel_if_queued(&self, message: impl Into<String>) -> bool {
        let mut record = self.record.write().await;
        if record.state != TaskState::Queued {
            return false;
        }
        record.state = TaskState::Cancelled;
        record.message = Some(message.into());
        record.completed_at = Some(Utc::now());
        record.finished_at = Some(Instant::now());
        true
    }

    /// Replace the status message unless the task is already terminal
    pub async fn set_message(&self, message: impl Into<String>) -> bool {
        let mut record = self.record.write().await;
        if record.state.is_terminal() {
            return false;
        }
        record.message = Some(message.into());
        true
    }

    /// Store the artifacts reported by the engine
    pub async fn set_results(&self, results: Vec<JobResult>) {
        self.record.write().await.results = results;
    }

    /// Store the outcome reported by the distributor
    pub async fn set_distribution(&self, outcome: DistributionOutcome) {
        self.record.write().await.distribution = Some(outcome);
    }

    /// Whether the task finished at least `retention` ago
    pub async fn finished_longer_than(&self, retention: Duration) -> bool {
        self.record
            .read()
            .await
            .finished_at
            .map(|at| at.elapsed() >= retention)
            .unwrap_or(false)
    }

    /// Consistent read-only projection of the handle
    ///
    /// Results are only visible once the task is terminal.
    pub async fn view(&self) -> TaskStatusView {
        let record = self.record.read().await;
        let results = if record.state.is_terminal() {
            record.results.clone()
        } else {
            Vec::new()
        };
        TaskStatusView {
            id: self.id,
            state: record.state,
            message: record.message.clone(),
            created_at: self.created_at,
            completed_at: record.completed_at,
            results,
            distribution: record.distribution.clone(),
        }
    }

    /// Clear the live flag; returns `true` only for the first caller
    pub(crate) fn release_live(&self) -> bool {
        self.live.swap(false, Ordering::SeqCst)
    }
}

/// Concurrency-safe map from task identifier to handle
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: RwLock<HashMap<TaskId, Arc<TaskHandle>>>,
}

impl TaskRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a handle
    ///
    /// Fails with `TaskAlreadyExists` when a non-terminal handle is registered
    /// under the same identifier. A terminal handle is replaced.
    pub async fn insert(&self, handle: Arc<TaskHandle>) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        if let Some(existing) = tasks.get(&handle.id()) {
            if !existing.state().await.is_terminal() {
                return Err(Error::TaskAlreadyExists { id: handle.id() });
            }
        }
        tasks.insert(handle.id(), handle);
        Ok(())
    }

    /// Look up a handle
    pub async fn get(&self, id: TaskId) -> Option<Arc<TaskHandle>> {
        self.tasks.read().await.get(&id).cloned()
    }

    /// Remove a handle
    pub async fn remove(&self, id: TaskId) -> Option<Arc<TaskHandle>> {
        self.tasks.write().await.remove(&id)
    }

    /// Point-in-time copy of every handle
    pub async fn snapshot(&self) -> Vec<Arc<TaskHandle>> {
        self.tasks.read().await.values().cloned().collect()
    }

    /// Remove every handle that finished at least `retention` ago
    ///
    /// Returns the evicted identifiers.
    pub async fn evict_finished(&self, retention: Duration) -> Vec<TaskId> {
        let mut tasks = self.tasks.write().await;
        let mut expired = Vec::new();
        for (id, handle) in tasks.iter() {
            if handle.finished_longer_than(retention).await {
                expired.push(*id);
            }
        }
        for id in &expired {
            tasks.remove(id);
        }
        expired
    }

    /// Number of registered handles
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Whether no handles are registered
    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}
