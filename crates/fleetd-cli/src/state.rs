//! `state.json` shared by the manual CLI commands.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use fleetd_core::{CoreError, RunId, TaskId, WorkerIdentity};

/// Default state file name, in the current working directory.
pub const STATE_FILE: &str = "state.json";

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to load {STATE_FILE} (run `fleetd setup` first): {0}")]
    Io(#[from] std::io::Error),

    #[error("{STATE_FILE} is not valid: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no claimed task in {STATE_FILE}; run `fleetd claim <task-id>` first")]
    NoClaimedTask,

    #[error(transparent)]
    Identity(#[from] CoreError),
}

/// Identity plus the most recent claim, persisted between invocations so
/// separate commands can operate on the same task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CliState {
    pub provisioner_id: String,
    pub worker_type: String,
    pub worker_group: String,
    pub worker_id: String,

    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub logs_put_url: Option<String>,
    #[serde(default)]
    pub result_put_url: Option<String>,
}

impl CliState {
    pub fn new(identity: &WorkerIdentity) -> Self {
        Self {
            provisioner_id: identity.provisioner_id.clone(),
            worker_type: identity.worker_type.clone(),
            worker_group: identity.worker_group.clone(),
            worker_id: identity.worker_id.clone(),
            task_id: None,
            run_id: None,
            logs_put_url: None,
            result_put_url: None,
        }
    }

    pub fn load(path: &Path) -> Result<Self, StateError> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), StateError> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn identity(&self) -> Result<WorkerIdentity, StateError> {
        Ok(WorkerIdentity::new(
            self.provisioner_id.clone(),
            self.worker_type.clone(),
            self.worker_group.clone(),
            self.worker_id.clone(),
        )?)
    }

    /// The currently claimed task and run.
    pub fn claimed(&self) -> Result<(TaskId, RunId), StateError> {
        match (&self.task_id, &self.run_id) {
            (Some(task_id), Some(run_id)) => {
                Ok((TaskId::new(task_id.clone()), RunId::new(run_id.clone())))
            }
            _ => Err(StateError::NoClaimedTask),
        }
    }
}
