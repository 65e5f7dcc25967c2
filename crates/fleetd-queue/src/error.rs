//! Error types for queue calls and uploads.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from queue endpoints and signed-URL uploads.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Network-level failure on any call.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The queue answered with a status outside the endpoint's contract.
    #[error("{endpoint} returned HTTP {status}")]
    UnexpectedStatus {
        endpoint: String,
        status: reqwest::StatusCode,
    },

    /// An artifact source file does not exist (or is not a regular file).
    #[error("no such file: {}", .0.display())]
    MissingFile(PathBuf),

    /// Reading an artifact source file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The queue's artifact-urls reply did not contain the requested name.
    #[error("queue issued no signed URL for artifact '{0}'")]
    MissingArtifactUrl(String),
}

impl QueueError {
    pub(crate) fn status(endpoint: impl Into<String>, status: reqwest::StatusCode) -> Self {
        Self::UnexpectedStatus {
            endpoint: endpoint.into(),
            status,
        }
    }
}
