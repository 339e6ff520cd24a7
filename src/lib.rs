//! # jobhost
//!
//! Asynchronous job hosting: callers stage input files, submit a job
//! description, poll its status and download the results.
//!
//! ## Design Philosophy
//!
//! jobhost is designed to be:
//! - **Non-blocking** - Submission returns an identifier immediately; work runs on a bounded pool
//! - **Pluggable** - The processing engine and the distribution step sit behind traits
//! - **Event-driven** - Consumers can subscribe to task events instead of polling
//! - **Sensible defaults** - Works out of the box with zero configuration
//!
//! ## Quick Start
//!
//! ```no_run
//! use jobhost::{Config, TaskOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = TaskOrchestrator::new(Config::default()).await?;
//!
//!     // Subscribe to events
//!     let mut events = orchestrator.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let upload = orchestrator
//!         .stage_upload(None, "input.csv", b"a,b\n1,2\n".to_vec(), false)
//!         .await?;
//!     let job = format!(r#"{{"report": "weekly", "uploadGuids": ["{upload}"]}}"#);
//!     let id = orchestrator.submit(&job, None).await?;
//!     println!("status: {:?}", orchestrator.status_of(id).await?);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Processing engine and distribution collaborators
pub mod engine;
/// Error types
pub mod error;
/// Job description parsing
pub mod job;
/// Task orchestration (decomposed into focused submodules)
pub mod orchestrator;
/// Task handles and the keyed registry
pub mod registry;
/// Upload areas, working directories and archives
pub mod staging;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use engine::{CommandEngine, Distributor, Engine, NoOpEngine, PassthroughDistributor};
pub use error::{ApiError, Error, ErrorDetail, Result, StagingError, ToHttpStatus};
pub use job::JobDescription;
pub use orchestrator::TaskOrchestrator;
pub use staging::{Materialized, StagingStore};
pub use types::{Event, Health, JobResult, TaskId, TaskState, TaskStatusView, UploadId};

/// Helper function to run the orchestrator with graceful signal handling.
///
/// Waits for a termination signal and then calls the orchestrator's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use jobhost::{Config, TaskOrchestrator, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let orchestrator = TaskOrchestrator::new(Config::default()).await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(&orchestrator).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(orchestrator: &TaskOrchestrator) -> Result<()> {
    wait_for_signal().await;
    orchestrator.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
