//! fleetd Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/HTTP
//! - Runtime specifics
//!
//! All types here represent the core business domain of the fleet worker
//! agent: worker identity, task claims/leases, task definitions and the
//! result/logs documents reported back to the queue.

pub mod claim;
pub mod document;
pub mod error;
pub mod identity;
pub mod ids;
pub mod task;

// Re-export commonly used types
pub use claim::TaskClaim;
pub use document::{ExecutionStatistics, LogsDocument, ResultDocument, TaskOutcome, WorkerRef};
pub use error::CoreError;
pub use identity::WorkerIdentity;
pub use ids::{RunId, TaskId};
pub use task::{ExecutionRecord, TaskDefinition};

/// Schema version stamped on result and logs documents.
pub const DOCUMENT_VERSION: &str = "0.2.0";
