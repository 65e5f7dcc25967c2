//! Wire shapes for the queue's `/v1` API.
//!
//! The schema is camelCase and defined exactly once here; nothing branches
//! on schema variants at runtime.

use chrono::{DateTime, Utc};
use fleetd_core::{RunId, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Reply to `claim-work` and `task/{taskId}/claim`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimReply {
    pub status: ClaimStatus,
    pub run_id: RunId,
    pub logs_put_url: String,
    pub result_put_url: String,
}

/// Task status section of a claim reply.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimStatus {
    pub task_id: TaskId,
    pub taken_until: DateTime<Utc>,
}

/// Reply to `task/new`: the queue assigns the task id.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreatedReply {
    pub status: TaskCreatedStatus,
}

/// Status section of a [`TaskCreatedReply`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreatedStatus {
    pub task_id: TaskId,
}

/// Reply to `pending-tasks/{provisionerId}`. Task entries are passed
/// through as raw JSON; the agent never interprets them.
#[derive(Debug, Clone, Deserialize)]
pub struct PendingTasksReply {
    #[serde(default)]
    pub tasks: Vec<serde_json::Value>,
}

/// `{workerGroup, workerId}` body for `claim-work`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WorkerScope<'a> {
    pub worker_group: &'a str,
    pub worker_id: &'a str,
}

/// `{workerGroup, workerId, runId}` body for claim, reclaim and completed.
/// `runId` is absent on a first manual claim of a specific task.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RunScope<'a> {
    pub worker_group: &'a str,
    pub worker_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<&'a str>,
}

/// Body for `task/{taskId}/artifact-urls`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ArtifactUrlsRequest<'a> {
    pub worker_group: &'a str,
    pub worker_id: &'a str,
    pub run_id: &'a str,
    pub artifacts: BTreeMap<&'a str, ArtifactSpec<'a>>,
}

/// `{contentType}` declaration for one artifact.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ArtifactSpec<'a> {
    pub content_type: &'a str,
}

/// Reply to `task/{taskId}/artifact-urls`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ArtifactUrlsReply {
    pub artifact_put_urls: HashMap<String, String>,
}
