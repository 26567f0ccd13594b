use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::constants::DEPENDENCY_RELATIONS;

/// A node in the knowledge graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub properties: BTreeMap<String, Value>,
}

/// A time-bounded edge between two entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(rename = "type")]
    pub kind: String,
    pub from_id: String,
    pub to_id: String,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub properties: BTreeMap<String, Value>,
}

impl Relationship {
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.valid_from <= at && self.valid_until.map_or(true, |until| until > at)
    }
}

#[derive(Debug, Default)]
struct GraphInner {
    graph: StableDiGraph<Entity, Relationship>,
    index: HashMap<String, NodeIndex>,
}

/// Temporal knowledge graph of project entities
#[derive(Debug, Default)]
pub struct TemporalKnowledgeGraph {
    inner: RwLock<GraphInner>,
}

impl TemporalKnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_entity(&self, kind: &str, properties: BTreeMap<String, Value>) -> Entity {
        let entity = Entity {
            id: Uuid::new_v4().to_string(),
            kind: kind.to_string(),
            created_at: Utc::now(),
            properties,
        };

        let mut inner = self.inner.write();
        let node = inner.graph.add_node(entity.clone());
        inner.index.insert(entity.id.clone(), node);
        entity
    }

    /// Link two existing entities.
    ///
    /// `valid_from` defaults to now; `valid_until` of `None` means open-ended.
    pub fn create_relationship(
        &self,
        from_id: &str,
        kind: &str,
        to_id: &str,
        properties: BTreeMap<String, Value>,
        valid_from: Option<DateTime<Utc>>,
        valid_until: Option<DateTime<Utc>>,
    ) -> Result<Relationship> {
        let mut inner = self.inner.write();
        let (Some(&from), Some(&to)) = (inner.index.get(from_id), inner.index.get(to_id)) else {
            bail!("Unknown entity in relationship {} -[{}]-> {}", from_id, kind, to_id);
        };

        let relationship = Relationship {
            kind: kind.to_string(),
            from_id: from_id.to_string(),
            to_id: to_id.to_string(),
            valid_from: valid_from.unwrap_or_else(Utc::now),
            valid_until,
            properties,
        };
        inner.graph.add_edge(from, to, relationship.clone());
        Ok(relationship)
    }

    pub fn entity(&self, id: &str) -> Option<Entity> {
        let inner = self.inner.read();
        inner
            .index
            .get(id)
            .and_then(|&node| inner.graph.node_weight(node).cloned())
    }

    /// Entities this one depends on, through currently valid dependency edges
    pub fn query_dependencies(&self, entity_id: &str) -> Vec<(Entity, Relationship)> {
        self.query_dependencies_at(entity_id, Utc::now())
    }

    pub fn query_dependencies_at(
        &self,
        entity_id: &str,
        at: DateTime<Utc>,
    ) -> Vec<(Entity, Relationship)> {
        let inner = self.inner.read();
        let Some(&node) = inner.index.get(entity_id) else {
            return Vec::new();
        };

        inner
            .graph
            .edges_directed(node, Direction::Incoming)
            .filter(|edge| {
                let rel = edge.weight();
                DEPENDENCY_RELATIONS.contains(&rel.kind.as_str()) && rel.is_valid_at(at)
            })
            .filter_map(|edge| {
                inner
                    .graph
                    .node_weight(edge.source())
                    .map(|dep| (dep.clone(), edge.weight().clone()))
            })
            .collect()
    }

    pub fn entity_count(&self) -> usize {
        self.inner.read().graph.node_count()
    }
}
