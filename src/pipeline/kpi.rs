use anyhow::{ensure, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::artifacts::{Kpi, OptimizationDirection};
use super::processor::{complete, StageProcessor};
use super::stage::Stage;
use crate::models::{extract_json, Model};
use crate::session::{HistoryEntry, Role, Session};

const KPI_PROMPT: &str = "You are a KPI fabrication system. Create measurable metrics from vague goals.

Given a user's qualitative objective and domain ontology, generate 2-4 KPIs.
For each KPI give: name, description, measurement_method, data_source,
optimization_direction (\"maximize\" or \"minimize\"), and optionally formula
and target_value. Be creative with proxy metrics.

Return a JSON array of KPIs.";

/// Models answer either with a bare array or wrapped in `{"kpis": [...]}`
#[derive(Deserialize)]
#[serde(untagged)]
enum KpiReply {
    List(Vec<Kpi>),
    Wrapped { kpis: Vec<Kpi> },
}

impl From<KpiReply> for Vec<Kpi> {
    fn from(reply: KpiReply) -> Self {
        match reply {
            KpiReply::List(kpis) | KpiReply::Wrapped { kpis } => kpis,
        }
    }
}

/// Maps qualitative goals to quantifiable proxy metrics
pub struct KpiFabricator {
    model: Option<Arc<dyn Model>>,
}

impl KpiFabricator {
    pub fn new(model: Option<Arc<dyn Model>>) -> Self {
        Self { model }
    }

    async fn fabricate(&self, session: &Session) -> Result<Vec<Kpi>> {
        let Some(model) = &self.model else {
            return Ok(reference_kpis());
        };

        let entities = session
            .ontology
            .iter()
            .flat_map(|o| o.entities.iter())
            .map(|e| format!("- {}: {}", e.kind, e.description))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "User goal: {}\n\nAvailable entities:\n{}\n\nGenerate KPIs:",
            session.input, entities
        );

        let reply = complete(model.as_ref(), KPI_PROMPT, prompt, 0.5).await?;
        let kpis: Vec<Kpi> = extract_json::<KpiReply>(&reply)?.into();
        ensure!(!kpis.is_empty(), "Model returned no KPIs");
        Ok(kpis)
    }
}

#[async_trait]
impl StageProcessor for KpiFabricator {
    fn stage(&self) -> Stage {
        Stage::Execution
    }

    async fn process(&self, mut session: Session) -> Result<Session> {
        let kpis = self.fabricate(&session).await?;
        session.record(Role::Assistant, HistoryEntry::Kpis { count: kpis.len() });
        session.kpis = Some(kpis);
        Ok(session)
    }
}

fn reference_kpis() -> Vec<Kpi> {
    vec![
        Kpi {
            name: "Team Stress Index".to_string(),
            description: "Measures overall team stress based on work patterns".to_string(),
            measurement_method:
                "Aggregate of after-hours commits, weekend work, and response times".to_string(),
            data_source: "Git commits, calendar events, communication logs".to_string(),
            target_value: None,
            optimization_direction: OptimizationDirection::Minimize,
            formula: Some(
                "(after_hours_commits * 0.4 + weekend_commits * 0.3 + avg_response_time * 0.3)"
                    .to_string(),
            ),
        },
        Kpi {
            name: "Team Sentiment Score".to_string(),
            description: "Tracks emotional tone in team communications".to_string(),
            measurement_method: "Sentiment analysis on messages and comments".to_string(),
            data_source: "Chat messages, code review comments, meeting notes".to_string(),
            target_value: Some("> 0.7".to_string()),
            optimization_direction: OptimizationDirection::Maximize,
            formula: None,
        },
        Kpi {
            name: "Work-Life Balance Indicator".to_string(),
            description: "Measures boundary between work and personal time".to_string(),
            measurement_method: "Ratio of work during business hours vs non-business hours"
                .to_string(),
            data_source: "Activity logs, commit timestamps".to_string(),
            target_value: None,
            optimization_direction: OptimizationDirection::Maximize,
            formula: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MockModel, ModelResponse};

    fn model_replying(content: String) -> Arc<dyn Model> {
        let mut model = MockModel::new();
        model.expect_name().return_const("mock".to_string());
        model.expect_chat().returning(move |_, _| {
            Ok(ModelResponse {
                content: content.clone(),
                usage: None,
                model_name: "mock".to_string(),
            })
        });
        Arc::new(model)
    }

    #[tokio::test]
    async fn test_offline_kpis() {
        let session = KpiFabricator::new(None)
            .process(Session::new("s", "I want a less stressed team"))
            .await
            .unwrap();

        let kpis = session.kpis.as_ref().unwrap();
        assert_eq!(kpis.len(), 3);
        assert!(kpis.iter().any(|k| k.name.contains("Stress")));
        assert_eq!(kpis[0].optimization_direction, OptimizationDirection::Minimize);
    }

    #[tokio::test]
    async fn test_model_reply_shapes() {
        const KPI: &str = r#"{"name": "Lead Time", "description": "d", "measurement_method": "m", "data_source": "erp", "optimization_direction": "minimize"}"#;

        let bare = format!("[{}]", KPI);
        let wrapped = format!("Sure.\n{{\"kpis\": [{}]}}", KPI);

        for reply in [bare, wrapped] {
            let session = KpiFabricator::new(Some(model_replying(reply)))
                .process(Session::new("s", "faster deliveries"))
                .await
                .unwrap();
            let kpis = session.kpis.unwrap();
            assert_eq!(kpis.len(), 1);
            assert_eq!(kpis[0].name, "Lead Time");
        }
    }
}
