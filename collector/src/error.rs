//! Collector-side error taxonomy. [`CollectorError::Bind`] is the only
//! variant that should ever reach `main` and set a nonzero exit code.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("failed to bind to {0}: {1}")]
    Bind(String, String),
    #[error("grpc server error: {0}")]
    Transport(#[from] tonic::transport::Error),
}
