use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An entity type in a generated domain ontology
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySchema {
    #[serde(rename = "type")]
    pub kind: String,
    /// Property name to a loose type hint ("str", "int", "date", ...)
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub description: String,
}

/// A directed relationship between two entity types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipSchema {
    pub from_entity: String,
    pub to_entity: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

/// Domain ontology emerging from a clarified conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainOntology {
    pub domain: String,
    pub entities: Vec<EntitySchema>,
    #[serde(default)]
    pub relationships: Vec<RelationshipSchema>,
    #[serde(default)]
    pub logic_rules: Vec<String>,
}

impl DomainOntology {
    pub fn has_entity(&self, kind: &str) -> bool {
        self.entities.iter().any(|e| e.kind == kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationDirection {
    Maximize,
    Minimize,
}

/// A measurable proxy metric for a qualitative goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpi {
    pub name: String,
    pub description: String,
    pub measurement_method: String,
    pub data_source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_value: Option<String>,
    pub optimization_direction: OptimizationDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
}

/// Output of the council: three perspectives and their synthesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deliberation {
    pub optimist_view: String,
    pub pessimist_view: String,
    pub historian_view: String,
    pub synthesis: String,
}
