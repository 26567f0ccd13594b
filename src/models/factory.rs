use anyhow::Result;
use std::sync::Arc;

use super::router::{ModelRouter, TaskType};
use super::traits::Model;
use super::unified::UnifiedModel;
use crate::app::LiteLlmConfig;

/// Factory for creating model instances using the unified LLM interface
pub struct ModelFactory;

impl ModelFactory {
    /// Create a model instance from a model identifier.
    /// All models go through the LiteLLM proxy, which handles authentication.
    pub fn create(model_id: &str, config: &LiteLlmConfig) -> Result<Arc<dyn Model>> {
        if model_id.trim().is_empty() {
            anyhow::bail!("Model identifier must not be empty");
        }
        Ok(Arc::new(UnifiedModel::new(model_id, config)?))
    }

    /// Create the model the router picks for a task
    pub fn for_task(
        router: &ModelRouter,
        task: TaskType,
        complexity_score: f64,
        config: &LiteLlmConfig,
    ) -> Result<Arc<dyn Model>> {
        let model_id = router.select_model(task, complexity_score, false);
        Self::create(model_id, config)
    }

    /// Whether a model is reachable through the proxy. An identifier that
    /// cannot even be built counts as unreachable.
    pub async fn validate(model_id: &str, config: &LiteLlmConfig) -> Result<bool> {
        match Self::create(model_id, config) {
            Ok(model) => model.validate_connection().await,
            Err(_) => Ok(false),
        }
    }
}
