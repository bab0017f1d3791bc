//! Pipeline error types.

use thiserror::Error;

use crate::operation::Operation;

/// Errors that can occur across the interpretation and safety pipeline.
///
/// Closed set, propagated explicitly — "operation not available" style
/// conditions are values here, never panics.
#[derive(Debug, Error)]
pub enum GlError {
    #[error("no input layer available for {0} operation")]
    MissingLayer(Operation),

    #[error("missing required parameter '{name}' for {operation} operation")]
    MissingParameter { operation: Operation, name: String },

    #[error("layer not found: {0}")]
    LayerNotFound(String),

    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<std::io::Error> for GlError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for GlError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Convenience alias for pipeline results.
pub type GlResult<T> = Result<T, GlError>;
