//! Error types for visual checks

use thiserror::Error;
use visual_engine::VisualError;
use visualcheck_core_types::CoreError;

#[derive(Debug, Error)]
pub enum CheckError {
    /// Bad check setup; fatal to the check
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Capture provider or locator resolver failed
    #[error("{source_name} failed: {message}")]
    Collaborator {
        source_name: String,
        message: String,
    },

    /// Baseline load or save failed
    #[error("Baseline store failure: {0}")]
    Store(String),

    #[error(transparent)]
    Engine(#[from] VisualError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CheckError {
    pub fn collaborator(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Collaborator {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Configuration errors surface to the caller; everything else becomes a
    /// failed assertion so one flaky check never aborts the batch.
    pub fn is_configuration(&self) -> bool {
        match self {
            CheckError::Configuration(_) | CheckError::Core(_) => true,
            CheckError::Engine(err) => err.is_configuration(),
            _ => false,
        }
    }
}

pub type CheckResult<T> = Result<T, CheckError>;
