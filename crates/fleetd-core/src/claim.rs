//! The claim held for a task while its lease is alive.

use crate::{RunId, TaskDefinition, TaskId};
use chrono::{DateTime, Utc};

/// Everything the agent holds for a claimed task: identifiers, the lease
/// expiry and the signed upload URLs issued at claim/reclaim time, plus the
/// fetched task definition.
///
/// A `TaskClaim` exists if and only if a lease is currently held; at most
/// one is held per agent instance.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskClaim {
    pub task_id: TaskId,
    pub run_id: RunId,

    /// Absolute lease expiry. Must move forward across reclaims.
    pub taken_until: DateTime<Utc>,

    /// Signed PUT URL for the logs document.
    pub logs_put_url: String,

    /// Signed PUT URL for the result document.
    pub result_put_url: String,

    /// The fetched task body.
    pub task: TaskDefinition,
}

impl TaskClaim {
    /// Apply a successful reclaim: new expiry and fresh upload URLs.
    ///
    /// Returns `false` when the new expiry does not advance the lease; the
    /// claim is then considered stale, but the queue's value still replaces
    /// ours since it is the source of truth for expiry.
    pub fn renew(
        &mut self,
        taken_until: DateTime<Utc>,
        logs_put_url: String,
        result_put_url: String,
    ) -> bool {
        let advanced = taken_until > self.taken_until;
        self.taken_until = taken_until;
        self.logs_put_url = logs_put_url;
        self.result_put_url = result_put_url;
        advanced
    }
}
