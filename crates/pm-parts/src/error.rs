//! Part recipe errors

use pm_cad::{GeometryError, ModelError};
use thiserror::Error;

/// Errors raised while decoding parameters or building a part
#[derive(Debug, Error)]
pub enum PartError {
    #[error("Unknown part: {0}")]
    UnknownPart(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(#[from] serde_json::Error),

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Modeling failed: {0}")]
    Model(#[from] ModelError),
}

impl From<GeometryError> for PartError {
    fn from(e: GeometryError) -> Self {
        PartError::Model(e.into())
    }
}

impl PartError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        PartError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Result type for part recipes
pub type PartResult<T> = Result<T, PartError>;
