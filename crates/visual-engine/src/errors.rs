//! Error types for the visual engine

use thiserror::Error;
use visualcheck_core_types::CoreError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum VisualError {
    /// Invalid screenshot or diff configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// No base strategy registered under the requested name
    #[error("Unable to find the strategy with the name: {0}")]
    UnknownStrategy(String),

    /// Candidate and baseline sizes differ
    #[error("Image dimensions do not match: baseline is {expected:?}, candidate is {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// Tiles could not be assembled into one image
    #[error("Failed to assemble capture: {0}")]
    Stitch(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl VisualError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Configuration mistakes are fatal to the check and never retried.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            VisualError::InvalidConfiguration(_) | VisualError::UnknownStrategy(_)
        )
    }
}

pub type VisualResult<T> = Result<T, VisualError>;
