//! Configuration types for jobhost

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Staging store configuration (upload areas and task working directories)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StagingConfig {
    /// Root directory holding one sub-directory per upload or task (default: "./temp")
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// Name of the audit copy of the job description inside a task directory (default: "job.json")
    #[serde(default = "default_job_file_name")]
    pub job_file_name: String,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            job_file_name: default_job_file_name(),
        }
    }
}

/// Task execution configuration (worker pool, retention, timeouts)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Maximum number of pipelines running at once (default: 4)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_tasks: usize,

    /// Maximum number of submitted tasks waiting for a worker slot (default: 256)
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// How long a finished task stays visible to status queries (default: 30 seconds)
    #[serde(default = "default_retention", with = "duration_serde")]
    pub retention: Duration,

    /// Interval of the background retention sweep (default: 10 seconds)
    #[serde(default = "default_cleanup_interval", with = "duration_serde")]
    pub cleanup_interval: Duration,

    /// Upper bound for one engine invocation (None = wait for the engine indefinitely)
    #[serde(default, with = "optional_duration_serde")]
    pub engine_timeout: Option<Duration>,

    /// Read produced artifact bytes into the task result payload (default: true)
    #[serde(default = "default_true")]
    pub embed_result_data: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: default_max_concurrent(),
            queue_capacity: default_queue_capacity(),
            retention: default_retention(),
            cleanup_interval: default_cleanup_interval(),
            engine_timeout: None,
            embed_result_data: true,
        }
    }
}

/// External engine executable
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path to the engine executable (None = no engine, tasks fail with NotSupported)
    #[serde(default)]
    pub engine_command: Option<PathBuf>,

    /// Extra arguments passed after `--workdir=<dir>`
    #[serde(default)]
    pub engine_args: Vec<String>,
}

/// API server configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServerIntegrationConfig {
    /// REST API settings
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:11271)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Largest accepted request body in bytes (default: 256 MiB)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Main configuration for the task orchestrator
///
/// Sub-configs are flattened, so the JSON format is a single flat object
/// apart from the nested `api` section.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Staging root and job file naming
    #[serde(flatten)]
    pub staging: StagingConfig,

    /// Worker pool, retention, and timeouts
    #[serde(flatten)]
    pub execution: ExecutionConfig,

    /// External engine executable
    #[serde(flatten)]
    pub engine: EngineConfig,

    /// API server settings
    #[serde(flatten)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Staging root directory
    pub fn root_dir(&self) -> &PathBuf {
        &self.staging.root_dir
    }

    /// Load a configuration from a JSON file; missing fields take their defaults
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read config file '{}': {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("failed to parse config file '{}': {}", path.display(), e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the orchestrator cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.execution.max_concurrent_tasks == 0 {
            return Err(Error::Config {
                message: "max_concurrent_tasks must be at least 1".to_string(),
                key: Some("max_concurrent_tasks".to_string()),
            });
        }
        if self.execution.queue_capacity == 0 {
            return Err(Error::Config {
                message: "queue_capacity must be at least 1".to_string(),
                key: Some("queue_capacity".to_string()),
            });
        }
        if self.staging.job_file_name.trim().is_empty() {
            return Err(Error::Config {
                message: "job_file_name must not be empty".to_string(),
                key: Some("job_file_name".to_string()),
            });
        }
        if self.execution.cleanup_interval.is_zero() {
            return Err(Error::Config {
                message: "cleanup_interval must be positive".to_string(),
                key: Some("cleanup_interval".to_string()),
            });
        }
        Ok(())
    }
}

fn default_root_dir() -> PathBuf {
    PathBuf::from("./temp")
}

fn default_job_file_name() -> String {
    "job.json".to_string()
}

fn default_max_concurrent() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    256
}

fn default_retention() -> Duration {
    Duration::from_secs(30)
}

fn default_cleanup_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 11271))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_max_body_bytes() -> usize {
    256 * 1024 * 1024
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
