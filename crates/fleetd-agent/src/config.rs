//! Agent configuration.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Agent configuration, with defaults matching a local queue setup.
///
/// Loaded from an optional JSON file; missing fields fall back to the
/// defaults. The struct is passed down explicitly — nothing reads
/// process-wide configuration state.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentConfig {
    /// Queue base URL.
    pub queue_url: String,

    /// Object store base URL (task definitions and artifacts).
    pub object_store_url: String,

    /// Consecutive cycle failures tolerated before the agent exits.
    pub failures_allowed: u32,

    /// Consecutive empty polls tolerated before "no tasks available".
    pub claim_retries: u32,

    /// Delay between claim attempts when no work is available (seconds).
    pub poll_delay_secs: u64,

    /// How long before `takenUntil` the lease is reclaimed (seconds).
    /// Sized to absorb one slow reclaim round-trip before expiry.
    pub reclaim_margin_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            queue_url: "http://localhost:3000".to_string(),
            object_store_url: "http://localhost:9000".to_string(),
            failures_allowed: 5,
            claim_retries: 5,
            poll_delay_secs: 30,
            reclaim_margin_secs: 180,
        }
    }
}

/// Errors loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

impl AgentConfig {
    /// Load configuration from a JSON file, or defaults when `path` is
    /// `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                let data = std::fs::read_to_string(path)?;
                Ok(serde_json::from_str(&data)?)
            }
            None => Ok(Self::default()),
        }
    }
}
