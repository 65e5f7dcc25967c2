//! Task definition and per-cycle execution record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The task body fetched from the object store (`{taskId}/task.json`).
///
/// Only `command` and `arguments` are interpreted by the agent; any other
/// execution parameters are preserved in `extra` for artifact consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    /// Program to execute.
    pub command: String,

    /// Arguments passed to the program.
    #[serde(default)]
    pub arguments: Vec<String>,

    /// Remaining execution parameters, passed through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl TaskDefinition {
    /// Create a definition with just a command and arguments.
    pub fn new(command: impl Into<String>, arguments: Vec<String>) -> Self {
        Self {
            command: command.into(),
            arguments,
            extra: BTreeMap::new(),
        }
    }
}

/// Ephemeral record of one subprocess execution. Created when the process
/// starts, discarded once the task cycle ends.
#[derive(Debug, Clone)]
pub struct ExecutionRecord {
    /// When the subprocess was spawned.
    pub started: DateTime<Utc>,

    /// When the subprocess exited.
    pub finished: DateTime<Utc>,

    /// Exit code; `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,

    /// Set when the process was killed because the lease was lost.
    pub aborted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn definition_preserves_unknown_parameters() {
        let task: TaskDefinition = serde_json::from_value(json!({
            "command": "/bin/build",
            "arguments": ["--release"],
            "env": {"CC": "clang"},
            "timeout": 3600
        }))
        .unwrap();

        assert_eq!(task.command, "/bin/build");
        assert_eq!(task.arguments, vec!["--release"]);
        assert_eq!(task.extra["timeout"], json!(3600));

        let back = serde_json::to_value(&task).unwrap();
        assert_eq!(back["env"]["CC"], "clang");
    }

    #[test]
    fn arguments_default_to_empty() {
        let task: TaskDefinition =
            serde_json::from_value(json!({"command": "true"})).unwrap();
        assert!(task.arguments.is_empty());
    }
}
