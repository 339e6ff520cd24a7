//! jobhost server - REST front end for the task orchestrator.

use clap::Parser;
use jobhost::{Config, TaskOrchestrator};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Asynchronous job hosting server
#[derive(Parser, Debug)]
#[command(name = "jobhost", version, about = "Asynchronous job hosting server")]
struct Args {
    /// JSON configuration file (missing fields take their defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind the HTTP API to
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Staging root for upload areas and task working directories
    #[arg(long)]
    workdir: Option<PathBuf>,

    /// Engine executable (name on PATH or a path)
    #[arg(long)]
    engine: Option<String>,

    /// Maximum number of tasks running at once
    #[arg(long)]
    max_concurrent: Option<usize>,
}

impl Args {
    /// Load the configuration file (if any) and apply command line overrides
    fn into_config(self) -> jobhost::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(bind) = self.bind {
            config.server.api.bind_address = bind;
        }
        if let Some(workdir) = self.workdir {
            config.staging.root_dir = workdir;
        }
        if let Some(max_concurrent) = self.max_concurrent {
            config.execution.max_concurrent_tasks = max_concurrent;
        }
        if let Some(engine) = self.engine {
            let resolved = which::which(&engine).unwrap_or_else(|_| PathBuf::from(&engine));
            config.engine.engine_command = Some(resolved);
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("jobhost=info,tower_http=info")),
        )
        .with_target(true)
        .init();

    let config = args.into_config()?;
    if config.engine.engine_command.is_none() {
        warn!("no engine configured, every task will fail until one is set");
    }

    let orchestrator = Arc::new(TaskOrchestrator::new(config).await?);
    let stop = CancellationToken::new();

    let mut server = tokio::spawn({
        let orchestrator = orchestrator.clone();
        let config = orchestrator.get_config();
        let stop = stop.clone();
        async move {
            jobhost::api::start_api_server_with_shutdown(orchestrator, config, async move {
                stop.cancelled().await
            })
            .await
        }
    });

    info!("jobhost started, press Ctrl+C to stop");

    let server_exited = tokio::select! {
        result = jobhost::run_with_shutdown(&orchestrator) => {
            result?;
            None
        }
        joined = &mut server => Some(joined),
    };

    match server_exited {
        None => {
            stop.cancel();
            server.await??;
        }
        Some(joined) => {
            warn!("API server exited, shutting down");
            orchestrator.shutdown().await?;
            joined??;
        }
    }

    info!("jobhost stopped");
    Ok(())
}
