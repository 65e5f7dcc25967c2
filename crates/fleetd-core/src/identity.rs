//! Worker identity.

use crate::CoreError;
use serde::{Deserialize, Serialize};

/// Immutable identity of this agent, sent to the queue on every call.
///
/// `provisioner_id` + `worker_type` scope which tasks the agent may claim;
/// `worker_group` + `worker_id` identify the individual agent instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerIdentity {
    pub provisioner_id: String,
    pub worker_type: String,
    pub worker_group: String,
    pub worker_id: String,
}

impl WorkerIdentity {
    /// Create a new identity. All four fields must be non-empty.
    pub fn new(
        provisioner_id: impl Into<String>,
        worker_type: impl Into<String>,
        worker_group: impl Into<String>,
        worker_id: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let identity = Self {
            provisioner_id: provisioner_id.into(),
            worker_type: worker_type.into(),
            worker_group: worker_group.into(),
            worker_id: worker_id.into(),
        };
        identity.validate()?;
        Ok(identity)
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.provisioner_id.is_empty() {
            return Err(CoreError::EmptyIdentityField("provisionerId"));
        }
        if self.worker_type.is_empty() {
            return Err(CoreError::EmptyIdentityField("workerType"));
        }
        if self.worker_group.is_empty() {
            return Err(CoreError::EmptyIdentityField("workerGroup"));
        }
        if self.worker_id.is_empty() {
            return Err(CoreError::EmptyIdentityField("workerId"));
        }
        Ok(())
    }
}
