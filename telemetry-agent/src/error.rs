//! Agent-side error taxonomy. Everything but [`AgentError::Config`] is
//! recoverable: the loop logs it and keeps ticking.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("config error: {0}")]
    Config(#[from] agent_core::ConfigError),
    #[error("rpc transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
    #[error("rpc call timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("rpc call failed: {0}")]
    Status(#[from] tonic::Status),
    #[error("hostname is empty")]
    EmptyHostname,
}
