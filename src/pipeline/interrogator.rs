use anyhow::{ensure, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::processor::{complete, StageProcessor};
use super::stage::Stage;
use crate::models::{extract_json, Model};
use crate::session::{HistoryEntry, Role, Session};

const INTERROGATION_PROMPT: &str = "You are a Socratic questioner helping users clarify vague project goals.

Generate 2-4 essential questions that will:
1. Identify the specific domain/industry
2. Clarify the primary objective (cost, speed, quality, resilience?)
3. Discover constraints (budget, time, resources)
4. Define success metrics

Use open-ended questions. Avoid yes/no questions.
Be concise and focused.

Respond with JSON: {\"questions\": [string], \"reasoning\": string}";

#[derive(Debug, Deserialize)]
struct ClarifyingQuestions {
    questions: Vec<String>,
    #[serde(default)]
    reasoning: String,
}

impl ClarifyingQuestions {
    fn fallback() -> Self {
        Self {
            questions: vec![
                "What is the primary objective - reducing cost, improving speed, or enhancing quality?"
                    .to_string(),
                "What are your key constraints in terms of budget, timeline, and resources?"
                    .to_string(),
                "How will you measure success for this project?".to_string(),
            ],
            reasoning: "These questions help clarify goals, constraints, and success criteria"
                .to_string(),
        }
    }
}

/// Asks clarifying questions when the input is too vague to plan from
pub struct SocraticInterrogator {
    model: Option<Arc<dyn Model>>,
}

impl SocraticInterrogator {
    pub fn new(model: Option<Arc<dyn Model>>) -> Self {
        Self { model }
    }

    async fn questions_for(&self, session: &Session) -> Result<ClarifyingQuestions> {
        let Some(model) = &self.model else {
            return Ok(ClarifyingQuestions::fallback());
        };

        let prompt = format!(
            "User input: {}\n\nAmbiguity score: {:.2}",
            session.input, session.ambiguity_score
        );
        let reply = complete(model.as_ref(), INTERROGATION_PROMPT, prompt, 0.7).await?;
        let parsed: ClarifyingQuestions = extract_json(&reply)?;
        ensure!(!parsed.questions.is_empty(), "Model returned no clarifying questions");
        Ok(parsed)
    }
}

#[async_trait]
impl StageProcessor for SocraticInterrogator {
    fn stage(&self) -> Stage {
        Stage::SocraticInterrogation
    }

    async fn process(&self, mut session: Session) -> Result<Session> {
        let ClarifyingQuestions {
            questions,
            reasoning,
        } = self.questions_for(&session).await?;

        session.record(
            Role::Assistant,
            HistoryEntry::Interrogation {
                questions,
                reasoning,
            },
        );
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MockModel, ModelResponse};

    fn reply(content: &'static str) -> MockModel {
        let mut model = MockModel::new();
        model.expect_name().return_const("mock".to_string());
        model.expect_chat().returning(move |_, _| {
            Ok(ModelResponse {
                content: content.to_string(),
                usage: None,
                model_name: "mock".to_string(),
            })
        });
        model
    }

    #[tokio::test]
    async fn test_fallback_questions() {
        let session = SocraticInterrogator::new(None)
            .process(Session::new("s", "help"))
            .await
            .unwrap();

        let questions = session.latest_questions().unwrap();
        assert_eq!(questions.len(), 3);
        assert!(questions.iter().all(|q| q.ends_with('?')));
        assert_eq!(session.history()[0].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_model_questions_are_parsed() {
        let model = reply(
            "Here you go:\n```json\n{\"questions\": [\"Which industry?\", \"What budget?\"], \"reasoning\": \"scope\"}\n```",
        );
        let session = SocraticInterrogator::new(Some(Arc::new(model)))
            .process(Session::new("s", "help"))
            .await
            .unwrap();

        assert_eq!(
            session.latest_questions().unwrap(),
            &["Which industry?".to_string(), "What budget?".to_string()][..]
        );
    }

    #[tokio::test]
    async fn test_empty_model_questions_fail() {
        let model = reply("{\"questions\": [], \"reasoning\": \"none\"}");
        let result = SocraticInterrogator::new(Some(Arc::new(model)))
            .process(Session::new("s", "help"))
            .await;
        assert!(result.is_err());
    }
}
