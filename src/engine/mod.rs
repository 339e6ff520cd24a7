//! Processing engine and distribution collaborators
//!
//! The orchestrator never does report processing itself. It hands each task
//! to an [`Engine`] and the engine's results to a [`Distributor`], both
//! behind traits so deployments and tests can plug in their own.
//!
//! ## Implementations
//!
//! - [`CommandEngine`]: runs an external executable in the task working directory
//! - [`NoOpEngine`]: fails every task with `NotSupported` (no engine configured)
//! - [`PassthroughDistributor`]: publishes nothing, reports the artifact list
//!
//! ## Usage
//!
//! ```no_run
//! use jobhost::engine::{CommandEngine, Engine, NoOpEngine};
//! use std::sync::Arc;
//!
//! let engine: Arc<dyn Engine> = match CommandEngine::from_path("report-engine") {
//!     Some(engine) => Arc::new(engine),
//!     None => Arc::new(NoOpEngine),
//! };
//! println!("using engine: {}", engine.name());
//! ```

mod command;
mod noop;
mod traits;

pub use command::CommandEngine;
pub use noop::{NoOpEngine, PassthroughDistributor};
pub use traits::{Distributor, Engine};

use crate::config::Config;
use std::sync::Arc;

/// Build the engine described by the configuration
///
/// Uses [`CommandEngine`] when `engine_command` is set, [`NoOpEngine`] otherwise.
pub fn engine_from_config(config: &Config) -> Arc<dyn Engine> {
    match &config.engine.engine_command {
        Some(command) => Arc::new(
            CommandEngine::new(command.clone())
                .with_args(config.engine.engine_args.clone())
                .with_job_file_name(config.staging.job_file_name.clone()),
        ),
        None => Arc::new(NoOpEngine),
    }
}
