//! Common test utilities for jobhost integration tests

#[allow(dead_code)]
pub mod assertions;
#[allow(dead_code)]
pub mod engines;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use engines::*;

use jobhost::{Config, Distributor, Engine, TaskOrchestrator};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Config rooted inside `temp_dir` with a small worker pool
pub fn test_config(temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.staging.root_dir = temp_dir.path().join("staging");
    config.execution.max_concurrent_tasks = 2;
    config.execution.queue_capacity = 16;
    config.execution.retention = Duration::from_secs(60);
    config
}

/// Build an orchestrator over a fresh temp root
///
/// The returned `TempDir` must be kept alive for the duration of the test.
#[allow(dead_code)]
pub async fn create_orchestrator(
    engine: Arc<dyn Engine>,
    distributor: Arc<dyn Distributor>,
    tweak: impl FnOnce(&mut Config),
) -> (TaskOrchestrator, TempDir) {
    let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
    let mut config = test_config(&temp_dir);
    tweak(&mut config);

    let orchestrator = TaskOrchestrator::with_collaborators(config, engine, distributor)
        .await
        .expect("failed to build orchestrator");
    (orchestrator, temp_dir)
}
