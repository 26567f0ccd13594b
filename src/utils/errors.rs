use std::time::Duration;
use thiserror::Error;

use crate::pipeline::Stage;

/// Main error type for cogflow
#[derive(Error, Debug)]
pub enum CogflowError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Stage {stage} failed: {message}")]
    Stage { stage: Stage, message: String },

    #[error("Stage {stage} timed out after {limit:?}")]
    Timeout { stage: Stage, limit: Duration },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CogflowError {
    /// Wrap a processor failure with the stage it came from
    pub fn stage(stage: Stage, err: anyhow::Error) -> Self {
        Self::Stage {
            stage,
            message: format!("{:#}", err),
        }
    }

    /// Whether the failure was the caller's fault rather than the pipeline's
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest(_) | Self::SessionNotFound(_))
    }
}
