//! fleetd Worker Agent Daemon
//!
//! Claims tasks from the queue, runs each task's command as a subprocess
//! under a renewed lease, uploads logs and the result document, reports
//! completion, and repeats until the failure allowance runs out.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

mod config;
mod executor;
mod lease;
mod metadata;
mod run_loop;
mod runner;

use config::AgentConfig;
use fleetd_core::WorkerIdentity;
use fleetd_queue::{QueueClient, QueueConfig};
use metadata::MetadataClient;
use run_loop::ProcessingLoop;
use runner::TaskRunner;

const DEFAULT_PROVISIONER_ID: &str = "aws-provisioner";

/// fleetd worker agent
#[derive(Parser)]
#[command(name = "fleetd-agent")]
#[command(about = "Fleet worker agent: claims and runs queue tasks", long_about = None)]
struct Cli {
    /// Provisioner id (defaults to "aws-provisioner")
    #[arg(long)]
    provisioner_id: Option<String>,

    /// Worker type (defaults to instance-type + image id from metadata)
    #[arg(long)]
    worker_type: Option<String>,

    /// Worker group (defaults to the availability zone)
    #[arg(long)]
    worker_group: Option<String>,

    /// Worker id (defaults to the instance id)
    #[arg(long)]
    worker_id: Option<String>,

    /// Queue base URL (overrides config file)
    #[arg(long)]
    queue_url: Option<String>,

    /// Object store base URL (overrides config file)
    #[arg(long)]
    object_store_url: Option<String>,

    /// Path to a JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for the per-cycle log files
    #[arg(long, default_value = ".")]
    work_dir: PathBuf,

    /// Shut the machine down when the processing loop ends
    #[arg(short, long)]
    shutdown: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    let mut config = AgentConfig::load(cli.config.as_deref())?;
    if let Some(url) = &cli.queue_url {
        config.queue_url = url.clone();
    }
    if let Some(url) = &cli.object_store_url {
        config.object_store_url = url.clone();
    }

    let identity = resolve_identity(&cli).await?;
    info!(
        provisioner_id = %identity.provisioner_id,
        worker_type = %identity.worker_type,
        worker_group = %identity.worker_group,
        worker_id = %identity.worker_id,
        queue = %config.queue_url,
        "Starting fleetd agent"
    );

    let client = QueueClient::new(QueueConfig::new(&config.queue_url, &config.object_store_url));
    let runner = TaskRunner::new(
        client,
        identity,
        cli.work_dir.clone(),
        Duration::from_secs(config.reclaim_margin_secs),
    );
    let mut processing_loop = ProcessingLoop::new(
        runner,
        config.failures_allowed,
        config.claim_retries,
        Duration::from_secs(config.poll_delay_secs),
    );

    tokio::select! {
        err = processing_loop.run() => {
            error!(error = %err, "processing loop ended");
            if cli.shutdown {
                info!("shutting machine down");
                if let Err(err) = tokio::process::Command::new("sudo")
                    .args(["shutdown", "-h", "now"])
                    .spawn()
                {
                    error!(error = %err, "failed to spawn shutdown command");
                }
            }
            std::process::exit(1);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("stop requested; exiting");
        }
    }

    Ok(())
}

/// Fill in identity fields, falling back to the instance metadata service
/// for anything not given on the command line.
async fn resolve_identity(cli: &Cli) -> Result<WorkerIdentity, Box<dyn std::error::Error>> {
    let provisioner_id = cli
        .provisioner_id
        .clone()
        .unwrap_or_else(|| DEFAULT_PROVISIONER_ID.to_string());

    // Only consulted for fields not given on the command line.
    let metadata = MetadataClient::new();

    let worker_type = match &cli.worker_type {
        Some(worker_type) => worker_type.clone(),
        None => {
            let (instance_type, image_id) =
                tokio::try_join!(metadata.instance_type(), metadata.image_id())?;
            format!("{}_{}", instance_type.replace('.', "-"), image_id)
        }
    };
    let worker_group = match &cli.worker_group {
        Some(worker_group) => worker_group.clone(),
        None => metadata.availability_zone().await?,
    };
    let worker_id = match &cli.worker_id {
        Some(worker_id) => worker_id.clone(),
        None => metadata.instance_id().await?,
    };

    Ok(WorkerIdentity::new(
        provisioner_id,
        worker_type,
        worker_group,
        worker_id,
    )?)
}
