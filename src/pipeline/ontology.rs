use anyhow::{ensure, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::artifacts::{DomainOntology, EntitySchema, RelationshipSchema};
use super::processor::{complete, StageProcessor};
use super::stage::Stage;
use crate::models::{extract_json, Model};
use crate::session::{HistoryEntry, Role, Session};

const ONTOLOGY_PROMPT: &str = "You are an ontology architect. Generate a domain-specific ontology.

Based on the user's clarified requirements, create:
1. Entities: core objects in this domain, with a type name, tracked properties and a description
2. Relationships: source entity type, target entity type, relationship type (e.g. BLOCKS, SUPPLIES_TO, DEPENDS_ON) and properties
3. Logic rules: domain-specific constraints

Don't use generic Task/Project unless that's truly the domain.

Respond with JSON: {\"domain\": string, \"entities\": [{\"type\", \"properties\", \"description\"}], \"relationships\": [{\"from_entity\", \"to_entity\", \"type\", \"properties\"}], \"logic_rules\": [string]}";

/// Derives the domain ontology once the goal is clear
pub struct OntologyArchitect {
    model: Option<Arc<dyn Model>>,
}

impl OntologyArchitect {
    pub fn new(model: Option<Arc<dyn Model>>) -> Self {
        Self { model }
    }

    async fn generate(&self, session: &Session) -> Result<DomainOntology> {
        let Some(model) = &self.model else {
            return Ok(reference_ontology());
        };

        let clarifications = session
            .history()
            .iter()
            .filter_map(|r| match &r.entry {
                HistoryEntry::Interrogation { questions, .. } => Some(questions.join("\n- ")),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n- ");
        let prompt = format!(
            "Original input: {}\n\nClarifications:\n- {}\n\nGenerate domain ontology:",
            session.input, clarifications
        );

        let reply = complete(model.as_ref(), ONTOLOGY_PROMPT, prompt, 0.4).await?;
        let ontology: DomainOntology = extract_json(&reply)?;
        ensure!(!ontology.entities.is_empty(), "Model ontology has no entities");
        Ok(ontology)
    }
}

#[async_trait]
impl StageProcessor for OntologyArchitect {
    fn stage(&self) -> Stage {
        Stage::OntologyArchitecture
    }

    async fn process(&self, mut session: Session) -> Result<Session> {
        let ontology = self.generate(&session).await?;
        session.record(
            Role::Assistant,
            HistoryEntry::Ontology {
                domain: ontology.domain.clone(),
                entity_count: ontology.entities.len(),
            },
        );
        session.ontology = Some(ontology);
        Ok(session)
    }
}

fn props(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Offline ontology for an electronics supply chain
fn reference_ontology() -> DomainOntology {
    let entity = |kind: &str, properties, description: &str| EntitySchema {
        kind: kind.to_string(),
        properties,
        description: description.to_string(),
    };
    let relationship = |from: &str, to: &str, kind: &str, properties| RelationshipSchema {
        from_entity: from.to_string(),
        to_entity: to.to_string(),
        kind: kind.to_string(),
        properties,
    };

    DomainOntology {
        domain: "electronics supply chain".to_string(),
        entities: vec![
            entity(
                "Supplier",
                props(&[("name", "str"), ("lead_time", "int"), ("cost_per_unit", "float")]),
                "Provider of raw materials or components",
            ),
            entity(
                "Inventory",
                props(&[("sku", "str"), ("quantity", "int"), ("location", "str")]),
                "Stock of materials or finished goods",
            ),
            entity(
                "Order",
                props(&[("order_id", "str"), ("quantity", "int"), ("delivery_date", "date")]),
                "Purchase order from supplier or customer",
            ),
        ],
        relationships: vec![
            relationship(
                "Supplier",
                "Inventory",
                "SUPPLIES_TO",
                props(&[("lead_time", "int")]),
            ),
            relationship(
                "Order",
                "Inventory",
                "AFFECTS",
                props(&[("quantity_change", "int")]),
            ),
        ],
        logic_rules: vec![
            "Inventory level must stay above safety stock threshold".to_string(),
            "Orders must be placed lead_time days before needed".to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MockModel, ModelResponse};

    #[tokio::test]
    async fn test_offline_ontology() {
        let session = OntologyArchitect::new(None)
            .process(Session::new("s", "Optimize electronics supply chain"))
            .await
            .unwrap();

        let ontology = session.ontology.as_ref().unwrap();
        assert_eq!(ontology.entities.len(), 3);
        assert!(ontology.has_entity("Supplier"));
        assert!(ontology.has_entity("Inventory"));
        assert_eq!(ontology.relationships.len(), 2);
        assert!(matches!(
            &session.history()[0].entry,
            HistoryEntry::Ontology { entity_count: 3, .. }
        ));
    }

    #[tokio::test]
    async fn test_model_ontology_is_parsed() {
        let mut model = MockModel::new();
        model.expect_name().return_const("mock".to_string());
        model.expect_chat().returning(|_, _| {
            Ok(ModelResponse {
                content: r#"{"domain": "construction", "entities": [{"type": "Phase", "properties": {"name": "str"}, "description": "A build phase"}], "relationships": [], "logic_rules": ["Foundations precede framing"]}"#.to_string(),
                usage: None,
                model_name: "mock".to_string(),
            })
        });

        let session = OntologyArchitect::new(Some(Arc::new(model)))
            .process(Session::new("s", "Gantt chart for construction"))
            .await
            .unwrap();
        let ontology = session.ontology.unwrap();
        assert_eq!(ontology.domain, "construction");
        assert!(ontology.has_entity("Phase"));
    }
}
