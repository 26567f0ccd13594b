use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use super::artifacts::Deliberation;
use super::processor::{complete, StageProcessor};
use super::stage::Stage;
use crate::constants::HISTORIAN_RECALL_LIMIT;
use crate::memory::{MemoryBackend, MemoryMatch, MemoryProvider};
use crate::models::Model;
use crate::session::{HistoryEntry, Role, Session};

const OPTIMIST_PROMPT: &str = "You are an optimistic strategist. Propose ambitious plans that maximize opportunity and innovation. Ignore constraints temporarily.";
const PESSIMIST_PROMPT: &str = "You are a risk analyst. Identify all possible failure modes, resource gaps, and worst-case scenarios. Be thorough and skeptical.";
const HISTORIAN_PROMPT: &str = "You verify consistency with past decisions and documentation. Check for contradictions.";
const SYNTHESIZER_PROMPT: &str = "You synthesize diverse viewpoints into a balanced, executable plan. Balance ambition with pragmatism.";

/// Strategy planning as a four-voice deliberation:
/// optimist proposes, pessimist critiques, historian checks memory, synthesizer merges.
pub struct CouncilDeliberation {
    model: Option<Arc<dyn Model>>,
    memory: Option<Arc<dyn MemoryProvider>>,
}

impl CouncilDeliberation {
    pub fn new(model: Option<Arc<dyn Model>>, memory: Option<Arc<dyn MemoryProvider>>) -> Self {
        Self { model, memory }
    }

    async fn optimist(&self, brief: &str) -> Result<String> {
        match &self.model {
            Some(model) => complete(model.as_ref(), OPTIMIST_PROMPT, brief.to_string(), 0.8).await,
            None => Ok("Optimist view: Launch boldly with maximum features and market impact. \
                        Focus on innovation and first-mover advantage."
                .to_string()),
        }
    }

    async fn pessimist(&self, brief: &str, plan: &str) -> Result<String> {
        match &self.model {
            Some(model) => {
                let input = format!("State: {}\n\nProposed Plan: {}", brief, plan);
                complete(model.as_ref(), PESSIMIST_PROMPT, input, 0.3).await
            }
            None => Ok("Pessimist view: The timeline is aggressive. Risk of technical debt, \
                        quality issues, and team burnout. Need contingency planning."
                .to_string()),
        }
    }

    async fn historian(&self, brief: &str) -> Result<String> {
        let past = self.recall(brief).await;
        match &self.model {
            Some(model) => {
                let history = past
                    .iter()
                    .map(|m| m.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n");
                let input = format!("{}\n\nPast decisions: {}", brief, history);
                complete(model.as_ref(), HISTORIAN_PROMPT, input, 0.2).await
            }
            None if past.is_empty() => Ok("Historian view: No significant conflicts with past \
                                           decisions. Timeline aligns with previous project estimates."
                .to_string()),
            None => Ok(format!(
                "Historian view: {} related past decision(s) on record; no conflicts found.",
                past.len()
            )),
        }
    }

    async fn synthesizer(&self, optimist: &str, pessimist: &str, historian: &str) -> Result<String> {
        match &self.model {
            Some(model) => {
                let input = format!(
                    "Optimist view: {}\n\nPessimist view: {}\n\nHistorian view: {}\n\nCreate synthesis:",
                    optimist, pessimist, historian
                );
                complete(model.as_ref(), SYNTHESIZER_PROMPT, input, 0.5).await
            }
            None => Ok("Synthesis: Phased rollout. MVP with core features first, then iterate. \
                        Build in buffer time for quality assurance."
                .to_string()),
        }
    }

    /// Past episodes related to the brief; memory problems only cost recall
    async fn recall(&self, brief: &str) -> Vec<MemoryMatch> {
        let Some(provider) = &self.memory else {
            return Vec::new();
        };

        let backend = provider.open();
        let matches = match backend.initialize().await {
            Ok(()) => retrieve(backend.as_ref(), brief).await,
            Err(e) => {
                warn!(error = %e, "Historian memory unavailable");
                Vec::new()
            }
        };
        if let Err(e) = backend.close().await {
            warn!(error = %e, "Failed to close historian memory");
        }
        matches
    }
}

async fn retrieve(backend: &dyn MemoryBackend, query: &str) -> Vec<MemoryMatch> {
    backend
        .retrieve(query, HISTORIAN_RECALL_LIMIT)
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "Historian recall failed");
            Vec::new()
        })
}

/// Plain-text summary of a session handed to each council member
fn brief(session: &Session) -> String {
    let mut brief = format!("Goal: {}", session.input);
    if let Some(ontology) = &session.ontology {
        let kinds: Vec<&str> = ontology.entities.iter().map(|e| e.kind.as_str()).collect();
        brief.push_str(&format!(
            "\nDomain: {} ({})",
            ontology.domain,
            kinds.join(", ")
        ));
        for rule in &ontology.logic_rules {
            brief.push_str(&format!("\nRule: {}", rule));
        }
    }
    if let Some(error) = &session.error {
        brief.push_str(&format!("\nPrevious attempt rejected: {}", error));
    }
    brief
}

#[async_trait]
impl StageProcessor for CouncilDeliberation {
    fn stage(&self) -> Stage {
        Stage::StrategyPlanning
    }

    async fn process(&self, mut session: Session) -> Result<Session> {
        let brief = brief(&session);

        let optimist_view = self.optimist(&brief).await?;
        let pessimist_view = self.pessimist(&brief, &optimist_view).await?;
        let historian_view = self.historian(&brief).await?;
        let synthesis = self
            .synthesizer(&optimist_view, &pessimist_view, &historian_view)
            .await?;
        debug!(session_id = %session.id, "Council reached a synthesis");

        session.record(
            Role::Assistant,
            HistoryEntry::Deliberation {
                synthesis: synthesis.clone(),
            },
        );
        session.deliberation = Some(Deliberation {
            optimist_view,
            pessimist_view,
            historian_view,
            synthesis,
        });
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryBackend as _, SharedMemory};
    use serde_json::json;

    #[tokio::test]
    async fn test_offline_deliberation() {
        let session = CouncilDeliberation::new(None, None)
            .process(Session::new("s", "Launch a product in 2 months"))
            .await
            .unwrap();

        let deliberation = session.deliberation.as_ref().unwrap();
        assert!(deliberation.optimist_view.starts_with("Optimist view"));
        assert!(deliberation.pessimist_view.starts_with("Pessimist view"));
        assert!(deliberation.historian_view.contains("No significant conflicts"));
        assert!(deliberation.synthesis.starts_with("Synthesis"));
        assert!(matches!(
            session.history().last().unwrap().entry,
            HistoryEntry::Deliberation { .. }
        ));
    }

    #[tokio::test]
    async fn test_historian_reads_memory() {
        let shared = SharedMemory::new();
        let handle = shared.handle();
        handle.initialize().await.unwrap();
        handle
            .store("Goal: launch product with phased rollout", json!({}))
            .await
            .unwrap();

        let council = CouncilDeliberation::new(None, Some(Arc::new(shared)));
        let session = council
            .process(Session::new("s", "launch product"))
            .await
            .unwrap();

        let historian = &session.deliberation.unwrap().historian_view;
        assert!(historian.contains("1 related past decision"), "{}", historian);
    }
}
