use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::episodic::EpisodicMemory;
use super::graph::{Entity, Relationship, TemporalKnowledgeGraph};
use super::traits::{MemoryBackend, MemoryMatch, MemoryProvider};

/// Process-wide memory stores, shared by every handle opened from them
#[derive(Debug, Clone, Default)]
pub struct SharedMemory {
    episodic: Arc<EpisodicMemory>,
    semantic: Arc<TemporalKnowledgeGraph>,
}

impl SharedMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores whose episodic side keeps at most `max_episodes` turns
    pub fn with_capacity(max_episodes: usize) -> Self {
        Self {
            episodic: Arc::new(EpisodicMemory::with_capacity(max_episodes)),
            semantic: Arc::default(),
        }
    }

    pub fn handle(&self) -> HybridMemory {
        HybridMemory {
            episodic: Arc::clone(&self.episodic),
            semantic: Arc::clone(&self.semantic),
            closed: AtomicBool::new(false),
        }
    }

    pub fn episode_count(&self) -> usize {
        self.episodic.len()
    }
}

impl MemoryProvider for SharedMemory {
    fn open(&self) -> Box<dyn MemoryBackend> {
        Box::new(self.handle())
    }
}

/// Hybrid memory handle combining:
/// - episodic memory for conversation nuance
/// - a temporal knowledge graph for structured relationships
#[derive(Debug)]
pub struct HybridMemory {
    episodic: Arc<EpisodicMemory>,
    semantic: Arc<TemporalKnowledgeGraph>,
    closed: AtomicBool,
}

impl HybridMemory {
    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            bail!("Memory handle used after close");
        }
        Ok(())
    }

    pub fn store_semantic_entity(
        &self,
        kind: &str,
        properties: BTreeMap<String, Value>,
    ) -> Result<Entity> {
        self.ensure_open()?;
        Ok(self.semantic.create_entity(kind, properties))
    }

    pub fn store_semantic_relationship(
        &self,
        from: &Entity,
        kind: &str,
        to: &Entity,
        properties: BTreeMap<String, Value>,
    ) -> Result<Relationship> {
        self.ensure_open()?;
        self.semantic
            .create_relationship(&from.id, kind, &to.id, properties, None, None)
    }

    /// Dependency chain for an entity
    pub fn causal_chain(&self, entity_id: &str) -> Result<Vec<(Entity, Relationship)>> {
        self.ensure_open()?;
        Ok(self.semantic.query_dependencies(entity_id))
    }
}

#[async_trait]
impl MemoryBackend for HybridMemory {
    async fn initialize(&self) -> Result<()> {
        // In-process stores need no connection; reopening a closed handle is allowed
        self.closed.store(false, Ordering::Release);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(episodes = self.episodic.len(), "Closed memory handle");
        }
        Ok(())
    }

    async fn store(&self, content: &str, metadata: Value) -> Result<()> {
        self.ensure_open()?;
        self.episodic.store(content, metadata);
        Ok(())
    }

    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<MemoryMatch>> {
        self.ensure_open()?;
        Ok(self.episodic.retrieve(query, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_episodic_memory_retrieval() {
        let memory = SharedMemory::new().handle();
        memory.initialize().await.unwrap();

        memory
            .store(
                "User asked about supply chain optimization focusing on cost reduction",
                json!({}),
            )
            .await
            .unwrap();

        let results = memory
            .retrieve("What did we discuss about supply chain?", 5)
            .await
            .unwrap();
        assert!(!results.is_empty());
        assert!(results[0].content.to_lowercase().contains("cost reduction"));
    }

    #[tokio::test]
    async fn test_semantic_memory_reasoning() {
        let memory = SharedMemory::new().handle();
        memory.initialize().await.unwrap();

        let name = |n: &str| BTreeMap::from([("name".to_string(), json!(n))]);
        let task_a = memory.store_semantic_entity("Task", name("Design Phase")).unwrap();
        let task_b = memory
            .store_semantic_entity("Task", name("Development Phase"))
            .unwrap();
        memory
            .store_semantic_relationship(&task_a, "PRECEDES", &task_b, BTreeMap::new())
            .unwrap();

        let chain = memory.causal_chain(&task_b.id).unwrap();
        assert!(!chain.is_empty());
        assert!(chain
            .iter()
            .any(|(entity, _)| entity.properties["name"] == "Design Phase"));
    }

    #[tokio::test]
    async fn test_handles_share_stores() {
        let shared = SharedMemory::new();
        let writer = shared.open();
        writer.initialize().await.unwrap();
        writer.store("gantt chart phases", json!({})).await.unwrap();
        writer.close().await.unwrap();

        let reader = shared.open();
        reader.initialize().await.unwrap();
        assert_eq!(reader.retrieve("gantt", 3).await.unwrap().len(), 1);
        assert_eq!(shared.episode_count(), 1);
    }

    #[tokio::test]
    async fn test_closed_handle_rejects_use() {
        let memory = SharedMemory::new().handle();
        memory.initialize().await.unwrap();
        memory.close().await.unwrap();
        // close is idempotent
        memory.close().await.unwrap();
        assert!(memory.store("x", json!({})).await.is_err());
    }
}
