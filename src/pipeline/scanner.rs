use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use super::processor::{complete, StageProcessor};
use super::stage::Stage;
use crate::constants::{AMBIGUITY_LENGTH_HORIZON, VAGUE_TERMS};
use crate::models::Model;
use crate::session::{HistoryEntry, Role, Session};

const SCAN_PROMPT: &str = "You are an ambiguity detection system. Analyze user input and identify:
1. Vague terms lacking specificity
2. Missing domain context
3. Undefined objectives or constraints
4. Unclear success metrics

Return a JSON with:
- ambiguity_factors: list of identified ambiguities
- missing_context: list of missing information
- clarity_score: 0-1 (0=totally ambiguous, 1=crystal clear)";

/// Scores how underspecified the latest input is
pub struct AmbiguityScanner {
    model: Option<Arc<dyn Model>>,
}

impl AmbiguityScanner {
    pub fn new(model: Option<Arc<dyn Model>>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl StageProcessor for AmbiguityScanner {
    fn stage(&self) -> Stage {
        Stage::AmbiguityScan
    }

    async fn process(&self, mut session: Session) -> Result<Session> {
        let score = lexical_ambiguity(&session.input);

        // The model only annotates; the score stays lexical
        let content = match &self.model {
            Some(model) => complete(model.as_ref(), SCAN_PROMPT, session.input.clone(), 0.3).await?,
            None => "Lexical analysis only".to_string(),
        };

        session.ambiguity_score = score;
        session.record(
            Role::System,
            HistoryEntry::Scan {
                score,
                analysis: format!("Ambiguity detected: {:.2}", score),
                content,
            },
        );
        Ok(session)
    }
}

/// Ambiguity in [0, 1] from vague-term density plus a short-input penalty.
///
/// Multi-word vague terms ("deal with") are matched against adjacent word pairs.
pub fn lexical_ambiguity(text: &str) -> f64 {
    let words: Vec<String> = text
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .collect();

    if words.is_empty() {
        return 1.0;
    }

    let singles = words
        .iter()
        .filter(|w| VAGUE_TERMS.contains(&w.as_str()))
        .count();
    let pairs = words
        .windows(2)
        .filter(|pair| {
            let phrase = format!("{} {}", pair[0], pair[1]);
            VAGUE_TERMS.contains(&phrase.as_str())
        })
        .count();

    let len = words.len() as f64;
    let vague_ratio = (singles + pairs) as f64 / len;
    let length_penalty = (1.0 - len / AMBIGUITY_LENGTH_HORIZON).max(0.0);

    (vague_ratio * 2.0 + length_penalty * 0.5).min(1.0)
}
