//! Error types for the shared agent/collector library.

use thiserror::Error;

/// Fatal at startup: config file missing, unreadable, or structurally
/// invalid. Never returned once the agent loop is running.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Read(String, String),
    #[error("failed to parse config json: {0}")]
    Parse(String),
}
