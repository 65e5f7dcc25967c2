//! Queue HTTP client and artifact uploads for fleetd.
//!
//! [`QueueClient`] wraps the queue's claim/reclaim/artifact-url/complete
//! endpoints and the object-store task-definition fetch. [`ArtifactUploader`]
//! puts files and JSON documents to the signed URLs the queue issues.
//! Both are stateless; all task state lives in the agent.

pub mod artifact;
pub mod client;
pub mod error;
pub mod wire;

pub use artifact::ArtifactUploader;
pub use client::{QueueClient, QueueConfig};
pub use error::QueueError;
pub use wire::{ClaimReply, ClaimStatus, PendingTasksReply, TaskCreatedReply};
