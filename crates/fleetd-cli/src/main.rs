//! fleetd CLI - manual task inspection against the queue.
//!
//! Commands share a `state.json` in the working directory so a claim made
//! by one invocation can be completed by another.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use fleetd_core::{TaskDefinition, TaskId, WorkerIdentity};
use fleetd_queue::{ArtifactUploader, QueueClient, QueueConfig};

mod state;

use state::{CliState, STATE_FILE};

/// fleetd CLI - manual queue interaction tool
#[derive(Parser)]
#[command(name = "fleetd")]
#[command(about = "Claim, run and complete queue tasks by hand", long_about = None)]
struct Cli {
    /// Queue base URL
    #[arg(long, default_value = "http://localhost:3000")]
    queue_url: String,

    /// Object store base URL
    #[arg(long, default_value = "http://localhost:9000")]
    object_store_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write identity fields to state.json
    Setup {
        #[arg(long)]
        provisioner_id: String,
        #[arg(long)]
        worker_type: String,
        #[arg(long)]
        worker_group: String,
        #[arg(long)]
        worker_id: String,
        /// Overwrite state.json if it exists
        #[arg(short = 'y', long)]
        overwrite: bool,
    },

    /// Post a new task to the queue
    #[command(name = "post-task")]
    PostTask {
        /// task.json file
        file: PathBuf,
    },

    /// Claim a task (or reclaim the current one when task-id is omitted)
    Claim {
        /// Task ID
        task_id: Option<String>,
    },

    /// Report the current task as completed
    Complete,

    /// Fetch a task definition
    #[command(name = "fetch-task")]
    FetchTask {
        /// Task ID (defaults to the current task)
        task_id: Option<String>,

        /// Write the task definition to a file
        #[arg(short, long)]
        dump: Option<PathBuf>,
    },

    /// List tasks for the configured provisioner
    #[command(name = "list-tasks")]
    ListTasks {
        /// Task state to list (only "pending" is supported)
        task_state: String,
    },

    /// Upload an artifact for the current task
    #[command(name = "put-artifact")]
    PutArtifact {
        /// Artifact name
        name: String,
        /// Source file
        file: PathBuf,
    },

    /// PUT a result document file to the stored signed URL
    #[command(name = "put-result")]
    PutResult {
        /// result.json file
        file: PathBuf,
    },

    /// Print current state from state.json
    State,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = QueueClient::new(QueueConfig::new(&cli.queue_url, &cli.object_store_url));
    let state_path = Path::new(STATE_FILE);

    match cli.command {
        Commands::Setup {
            provisioner_id,
            worker_type,
            worker_group,
            worker_id,
            overwrite,
        } => {
            if state_path.exists() && !overwrite {
                return Err(format!(
                    "{} already exists; pass --overwrite to replace it",
                    STATE_FILE
                )
                .into());
            }
            let identity =
                WorkerIdentity::new(provisioner_id, worker_type, worker_group, worker_id)?;
            let state = CliState::new(&identity);
            state.save(state_path)?;
            println!("Wrote {} to current working directory", STATE_FILE);
            println!("{}", serde_json::to_string_pretty(&state)?);
        }

        Commands::PostTask { file } => {
            let task: TaskDefinition = serde_json::from_str(&std::fs::read_to_string(&file)?)?;
            let reply = client.post_task(&task).await?;
            println!(
                "Task posted successfully, task-id: {}",
                reply.status.task_id
            );
        }

        Commands::Claim { task_id } => {
            let mut state = CliState::load(state_path)?;
            let identity = state.identity()?;

            // Without an explicit task-id this is a reclaim of the
            // current task.
            let reply = match task_id {
                Some(task_id) => {
                    client
                        .claim_task(&identity, &TaskId::new(task_id), None)
                        .await?
                }
                None => {
                    let (task_id, run_id) = state.claimed()?;
                    client.reclaim(&identity, &task_id, &run_id).await?
                }
            };

            println!("Task claimed until: {}", reply.status.taken_until);
            state.task_id = Some(reply.status.task_id.into_inner());
            state.run_id = Some(reply.run_id.into_inner());
            state.logs_put_url = Some(reply.logs_put_url);
            state.result_put_url = Some(reply.result_put_url);
            state.save(state_path)?;
        }

        Commands::Complete => {
            let state = CliState::load(state_path)?;
            let identity = state.identity()?;
            let (task_id, run_id) = state.claimed()?;
            client.report_completed(&identity, &task_id, &run_id).await?;
            println!("Task {} completed!", task_id);
        }

        Commands::FetchTask { task_id, dump } => {
            let task_id = match task_id {
                Some(task_id) => TaskId::new(task_id),
                None => CliState::load(state_path)?.claimed()?.0,
            };
            let task = client.fetch_task_definition(&task_id).await?;
            let pretty = serde_json::to_string_pretty(&task)?;
            println!("{}", pretty);
            if let Some(path) = dump {
                std::fs::write(path, pretty)?;
            }
        }

        Commands::ListTasks { task_state } => {
            if task_state != "pending" {
                return Err("only the 'pending' task state is supported".into());
            }
            let state = CliState::load(state_path)?;
            let reply = client.list_pending_tasks(&state.provisioner_id).await?;
            println!("{}", serde_json::to_string_pretty(&reply.tasks)?);
        }

        Commands::PutArtifact { name, file } => {
            let state = CliState::load(state_path)?;
            let identity = state.identity()?;
            let (task_id, run_id) = state.claimed()?;
            let uploader = ArtifactUploader::new(client);
            let url = uploader
                .upload(&identity, &task_id, &run_id, &name, &file, None)
                .await?;
            println!("Uploaded {} to {}", name, url);
        }

        Commands::PutResult { file } => {
            let state = CliState::load(state_path)?;
            let url = state
                .result_put_url
                .ok_or("no resultPutUrl in state.json; claim a task first")?;
            let document: serde_json::Value =
                serde_json::from_str(&std::fs::read_to_string(&file)?)?;
            let uploader = ArtifactUploader::new(client);
            uploader.put_json(&url, &document).await?;
            println!("Uploaded {} successfully", file.display());
        }

        Commands::State => {
            let state = CliState::load(state_path)?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
    }

    Ok(())
}
