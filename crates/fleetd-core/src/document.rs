//! Result and logs documents uploaded to the queue's signed URLs.
//!
//! Wire shapes match the original `/v1` camelCase schema; the field names
//! here are part of the queue contract, not ours to rename.

use crate::{ExecutionRecord, WorkerIdentity, DOCUMENT_VERSION};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `{version, artifacts, statistics, worker, result}` — produced exactly
/// once per completed task, immediately before the completion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultDocument {
    pub version: String,

    /// Artifact name to public URL.
    pub artifacts: BTreeMap<String, String>,

    pub statistics: ExecutionStatistics,
    pub worker: WorkerRef,
    pub result: TaskOutcome,
}

impl ResultDocument {
    /// Build the result document for a finished execution.
    pub fn new(
        identity: &WorkerIdentity,
        record: &ExecutionRecord,
        artifacts: BTreeMap<String, String>,
    ) -> Self {
        Self {
            version: DOCUMENT_VERSION.to_string(),
            artifacts,
            statistics: ExecutionStatistics {
                started: record.started,
                finished: record.finished,
            },
            worker: WorkerRef {
                worker_group: identity.worker_group.clone(),
                worker_id: identity.worker_id.clone(),
            },
            result: TaskOutcome {
                exitcode: record.exit_code.unwrap_or(-1),
            },
        }
    }
}

/// When execution started and finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStatistics {
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
}

/// Which agent ran the task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRef {
    pub worker_group: String,
    pub worker_id: String,
}

/// Task-specific result section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub exitcode: i32,
}

/// `{version, logs}` — uploaded to the claim's `logsPutUrl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogsDocument {
    pub version: String,

    /// Log name to public URL.
    pub logs: BTreeMap<String, String>,
}

impl LogsDocument {
    pub fn new(logs: BTreeMap<String, String>) -> Self {
        Self {
            version: DOCUMENT_VERSION.to_string(),
            logs,
        }
    }
}
