//! Newtype wrappers for queue-assigned identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a task, assigned by the queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    /// Create a new TaskId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Identifier for one run of a task, assigned by the queue at claim time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    /// Create a new RunId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RunId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RunId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_roundtrip() {
        let id = TaskId::new("2Pk06yX8RBWm3eYyIzEKLQ");
        assert_eq!(id.as_str(), "2Pk06yX8RBWm3eYyIzEKLQ");
        assert_eq!(id.to_string(), "2Pk06yX8RBWm3eYyIzEKLQ");
        assert_eq!(id.into_inner(), "2Pk06yX8RBWm3eYyIzEKLQ");
    }

    #[test]
    fn run_id_from_str() {
        let id: RunId = "0".into();
        assert_eq!(id.as_str(), "0");
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = TaskId::new("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
        let back: TaskId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(back, id);
    }
}
