//! Engine backed by an external executable

use super::traits::Engine;
use crate::job::JobDescription;
use crate::types::{JobResult, TaskId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Longest stderr excerpt carried into a failure message
const STDERR_EXCERPT_LEN: usize = 512;

/// Engine that runs an external executable once per task
///
/// The executable is started inside the task working directory as
/// `<binary> --workdir=<dir> [args...]`. The job description is available
/// there as the job file. Every regular file that appears in the directory
/// during the run is reported as a result. The process is killed when the
/// task is cancelled.
///
/// # Examples
///
/// ```no_run
/// use jobhost::engine::CommandEngine;
/// use std::path::PathBuf;
///
/// let engine = CommandEngine::new(PathBuf::from("/usr/local/bin/report-engine"))
///     .with_args(vec!["--quiet".to_string()]);
/// ```
pub struct CommandEngine {
    binary_path: PathBuf,
    args: Vec<String>,
    job_file_name: String,
}

impl CommandEngine {
    /// Create an engine for an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            args: Vec::new(),
            job_file_name: "job.json".to_string(),
        }
    }

    /// Resolve a binary by name through PATH
    ///
    /// Returns `None` if the binary is not found.
    pub fn from_path(name: &str) -> Option<Self> {
        which::which(name).ok().map(Self::new)
    }

    /// Extra arguments passed after `--workdir=<dir>`
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Name of the job file, which is never reported as a result
    pub fn with_job_file_name(mut self, name: impl Into<String>) -> Self {
        self.job_file_name = name.into();
        self
    }

    /// Path of the executable
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }
}

#[async_trait]
impl Engine for CommandEngine {
    async fn run(
        &self,
        _job: &JobDescription,
        task_id: TaskId,
        work_dir: &Path,
        cancel: CancellationToken,
    ) -> crate::Result<Vec<JobResult>> {
        let before = list_files(work_dir).await?;

        let child = Command::new(&self.binary_path)
            .arg(format!("--workdir={}", work_dir.display()))
            .args(&self.args)
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                crate::Error::ExternalTool(format!(
                    "failed to start engine {}: {}",
                    self.binary_path.display(),
                    e
                ))
            })?;
        debug!(task_id = %task_id, binary = ?self.binary_path, pid = ?child.id(), "engine started");

        // Dropping the wait future drops the child, which kills it
        let output = tokio::select! {
            output = child.wait_with_output() => output.map_err(|e| {
                crate::Error::ExternalTool(format!("failed to wait for engine: {}", e))
            })?,
            _ = cancel.cancelled() => {
                warn!(task_id = %task_id, "engine killed after cancellation");
                return Err(crate::Error::Cancelled);
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT_LEN).collect();
            return Err(crate::Error::Engine(format!(
                "engine exited with {}: {}",
                output.status, excerpt
            )));
        }

        let after = list_files(work_dir).await?;
        let mut results: Vec<JobResult> = after
            .into_iter()
            .filter(|(rel, _)| !before.contains_key(rel))
            .filter(|(rel, _)| rel.as_os_str() != self.job_file_name.as_str())
            .map(|(rel, size)| {
                let mut result = JobResult::from_path(rel);
                result.size_bytes = Some(size);
                result
            })
            .collect();
        results.sort_by(|a, b| a.path.cmp(&b.path));

        info!(task_id = %task_id, results = results.len(), "engine finished");
        Ok(results)
    }

    fn name(&self) -> &'static str {
        "command"
    }
}

/// Regular files below `dir`, keyed by relative path, with their sizes
async fn list_files(dir: &Path) -> crate::Result<HashMap<PathBuf, u64>> {
    let dir = dir.to_path_buf();
    tokio::task::spawn_blocking(move || {
        WalkDir::new(&dir)
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let size = e.metadata().ok()?.len();
                let rel = e.path().strip_prefix(&dir).ok()?.to_path_buf();
                Some((rel, size))
            })
            .collect::<HashMap<_, _>>()
    })
    .await
    .map_err(|e| crate::Error::Other(format!("directory scan panicked: {}", e)))
}
