//! Core domain errors.

use thiserror::Error;

/// Core domain errors for fleetd.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A worker identity field was empty.
    #[error("Worker identity field '{0}' must not be empty")]
    EmptyIdentityField(&'static str),
}
