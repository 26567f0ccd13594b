use anyhow::Result;
use async_trait::async_trait;

use super::types::{ChatMessage, ModelConfig, ModelResponse};

/// Core trait that all model backends must implement
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Model: Send + Sync {
    /// Send a chat conversation to the model and get a response
    async fn chat(&self, messages: &[ChatMessage], config: &ModelConfig) -> Result<ModelResponse>;

    /// Get the name of the model
    fn name(&self) -> &str;

    /// Check if this is a local model (no API calls)
    fn is_local(&self) -> bool;

    /// Validate that the model is accessible
    async fn validate_connection(&self) -> Result<bool> {
        Ok(true)
    }
}
