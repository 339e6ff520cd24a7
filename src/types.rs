//! Core types for jobhost

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Unique identifier for a task (and for an upload area, which shares the type)
///
/// Used as the registry key and as the directory name under the staging root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

/// Identifier of an upload area
pub type UploadId = TaskId;

impl TaskId {
    /// Generate a new random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID value
    pub fn get(&self) -> Uuid {
        self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TaskId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<TaskId> for Uuid {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// Lifecycle state of a task
///
/// States only move forward. `Cancelled` is reachable from any non-terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Handle inserted, execution not yet begun
    Queued,
    /// Copying upload files into the working directory
    Staging,
    /// Engine invocation in progress
    Running,
    /// Distribution step in progress
    Distributing,
    /// Engine and distribution both completed
    Succeeded,
    /// Engine or distribution raised an error
    Failed,
    /// Cancellation was observed before completion
    Cancelled,
}

impl TaskState {
    /// Returns true for `Succeeded`, `Failed` and `Cancelled`
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    /// Position in the forward ordering; all terminal states share the last rank
    fn rank(&self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Staging => 1,
            Self::Running => 2,
            Self::Distributing => 3,
            Self::Succeeded | Self::Failed | Self::Cancelled => 4,
        }
    }

    /// Whether moving from `self` to `next` keeps the lifecycle monotonic
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        if self.is_terminal() {
            return false;
        }
        next.rank() > self.rank()
    }

    /// Lowercase name as used in the API and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Staging => "staging",
            Self::Running => "running",
            Self::Distributing => "distributing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "queued" => Ok(Self::Queued),
            "staging" => Ok(Self::Staging),
            "running" => Ok(Self::Running),
            "distributing" => Ok(Self::Distributing),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown task state '{}'", other)),
        }
    }
}

/// One output artifact produced by the engine inside a task working directory
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    /// File name of the artifact
    pub name: String,
    /// Location of the artifact (relative paths resolve against the working directory)
    pub path: PathBuf,
    /// Size in bytes, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    /// Artifact content, when eagerly embedded (base64 on the wire)
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_bytes")]
    pub data: Option<Vec<u8>>,
}

impl JobResult {
    /// Describe an artifact by path, naming it after the final path component
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            path,
            size_bytes: None,
            data: None,
        }
    }
}

/// Opaque descriptor returned by the distribution step
pub type DistributionOutcome = serde_json::Value;

/// Read-only projection of a task handle
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskStatusView {
    /// Task identifier
    pub id: TaskId,
    /// Current state
    pub state: TaskState,
    /// Last status or failure message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// When the task was submitted
    pub created_at: DateTime<Utc>,
    /// When the task reached a terminal state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Artifacts produced so far (populated once the engine has returned)
    #[serde(default)]
    pub results: Vec<JobResult>,
    /// Outcome reported by the distribution step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution: Option<DistributionOutcome>,
}

/// Service health derived from the live-task counter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Health {
    /// No live tasks
    Ready,
    /// Number of live (queued or executing) tasks
    Running(usize),
}

impl Health {
    /// Build from the live-task count
    pub fn from_count(count: usize) -> Self {
        if count == 0 {
            Self::Ready
        } else {
            Self::Running(count)
        }
    }
}

impl std::fmt::Display for Health {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready => f.write_str("ready"),
            Self::Running(n) => write!(f, "running ({})", n),
        }
    }
}

/// Events emitted by the orchestrator
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Task accepted and waiting for a worker slot
    Queued {
        /// Task ID
        id: TaskId,
    },

    /// Task moved to a new non-terminal state
    StateChanged {
        /// Task ID
        id: TaskId,
        /// The new state
        state: TaskState,
    },

    /// Task reached a terminal state
    Finished {
        /// Task ID
        id: TaskId,
        /// Terminal state
        state: TaskState,
        /// Failure or status message
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// Task handle evicted from the registry after the retention window
    Evicted {
        /// Task ID
        id: TaskId,
    },

    /// File staged into an upload area
    Uploaded {
        /// Upload area ID
        id: UploadId,
        /// Staged file name
        filename: String,
    },

    /// Orchestrator is shutting down
    Shutdown,
}

mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(data: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match data {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = Option::<String>::deserialize(deserializer)?;
        encoded
            .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
