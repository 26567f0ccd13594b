use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use super::council::CouncilDeliberation;
use super::interrogator::SocraticInterrogator;
use super::kpi::KpiFabricator;
use super::ontology::OntologyArchitect;
use super::reflector::Reflector;
use super::scanner::AmbiguityScanner;
use super::stage::Stage;
use crate::app::LiteLlmConfig;
use crate::memory::MemoryProvider;
use crate::models::{ChatMessage, Model, ModelConfig, ModelFactory, ModelRouter, TaskType};
use crate::session::Session;

/// One pipeline stage as a black box over session state.
///
/// State moves in and out by value, so a processor cannot hold on to it past
/// the call.
#[async_trait]
pub trait StageProcessor: Send + Sync {
    /// The stage this processor runs for
    fn stage(&self) -> Stage;

    async fn process(&self, session: Session) -> Result<Session>;
}

/// Registered processor per stage
#[derive(Clone, Default)]
pub struct StageSet {
    processors: HashMap<Stage, Arc<dyn StageProcessor>>,
}

impl StageSet {
    /// Local heuristics for every stage; no network access
    pub fn heuristic(memory: Option<Arc<dyn MemoryProvider>>) -> Self {
        Self::default()
            .with_processor(Arc::new(AmbiguityScanner::new(None)))
            .with_processor(Arc::new(SocraticInterrogator::new(None)))
            .with_processor(Arc::new(OntologyArchitect::new(None)))
            .with_processor(Arc::new(CouncilDeliberation::new(None, memory)))
            .with_processor(Arc::new(KpiFabricator::new(None)))
            .with_processor(Arc::new(Reflector))
    }

    /// Model-backed processors, each on the model the router picks for its task
    pub fn with_model(
        router: &ModelRouter,
        config: &LiteLlmConfig,
        memory: Option<Arc<dyn MemoryProvider>>,
    ) -> Result<Self> {
        let model = |task, complexity| ModelFactory::for_task(router, task, complexity, config);

        Ok(Self::default()
            .with_processor(Arc::new(AmbiguityScanner::new(Some(model(
                TaskType::AmbiguityScan,
                0.2,
            )?))))
            .with_processor(Arc::new(SocraticInterrogator::new(Some(model(
                TaskType::SocraticInterrogation,
                0.5,
            )?))))
            .with_processor(Arc::new(OntologyArchitect::new(Some(model(
                TaskType::OntologyGeneration,
                0.7,
            )?))))
            .with_processor(Arc::new(CouncilDeliberation::new(
                Some(model(TaskType::CouncilDeliberation, 0.9)?),
                memory,
            )))
            .with_processor(Arc::new(KpiFabricator::new(Some(model(
                TaskType::KpiFabrication,
                0.7,
            )?))))
            .with_processor(Arc::new(Reflector)))
    }

    /// Register `processor` for its stage, replacing any previous one
    pub fn with_processor(mut self, processor: Arc<dyn StageProcessor>) -> Self {
        self.processors.insert(processor.stage(), processor);
        self
    }

    pub fn for_stage(&self, stage: Stage) -> Option<Arc<dyn StageProcessor>> {
        self.processors.get(&stage).cloned()
    }
}

/// Single-message completion shared by the model-backed processors
pub(crate) async fn complete(
    model: &dyn Model,
    system: &str,
    user: String,
    temperature: f32,
) -> Result<String> {
    let messages = [ChatMessage::system(system), ChatMessage::user(user)];
    let response = model
        .chat(&messages, &ModelConfig::with_temperature(temperature))
        .await
        .with_context(|| format!("Completion from {} failed", model.name()))?;
    Ok(response.content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heuristic_set_covers_working_stages() {
        let stages = StageSet::heuristic(None);
        for stage in [
            Stage::AmbiguityScan,
            Stage::SocraticInterrogation,
            Stage::OntologyArchitecture,
            Stage::StrategyPlanning,
            Stage::Execution,
            Stage::Reflection,
        ] {
            let processor = stage_processor(&stages, stage);
            assert_eq!(processor.stage(), stage);
        }
        assert!(stages.for_stage(Stage::Done).is_none());
    }

    #[test]
    fn test_model_set_builds_without_network() {
        let stages = StageSet::with_model(
            &ModelRouter::default(),
            &LiteLlmConfig::default(),
            None,
        )
        .unwrap();
        assert!(stages.for_stage(Stage::Execution).is_some());
    }

    fn stage_processor(stages: &StageSet, stage: Stage) -> Arc<dyn StageProcessor> {
        stages.for_stage(stage).unwrap()
    }
}
