use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_MODEL_COST;

/// Kinds of work a stage asks a model to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    AmbiguityScan,
    SocraticInterrogation,
    OntologyGeneration,
    KpiFabrication,
    CouncilDeliberation,
    StrategyPlanning,
}

/// Model costs per 1M tokens (input/output average)
const MODEL_COSTS: &[(&str, f64)] = &[
    ("claude-3-5-sonnet-20241022", 0.015),
    ("claude-3-haiku-20240307", 0.001),
    ("gpt-4o", 0.025),
    ("gpt-4o-mini", 0.0015),
    ("gemini-2.0-flash-exp", 0.0),
];

struct Candidates {
    preferred: &'static [&'static str],
    fallback: &'static [&'static str],
}

fn candidates(task: TaskType) -> Candidates {
    match task {
        TaskType::AmbiguityScan => Candidates {
            preferred: &["claude-3-haiku-20240307", "gpt-4o-mini"],
            fallback: &["claude-3-5-sonnet-20241022"],
        },
        TaskType::SocraticInterrogation => Candidates {
            preferred: &["claude-3-5-sonnet-20241022", "gpt-4o"],
            fallback: &["gpt-4o-mini"],
        },
        TaskType::OntologyGeneration => Candidates {
            preferred: &["claude-3-5-sonnet-20241022", "gemini-2.0-flash-exp"],
            fallback: &["gpt-4o"],
        },
        TaskType::KpiFabrication => Candidates {
            preferred: &["claude-3-5-sonnet-20241022"],
            fallback: &["gpt-4o"],
        },
        TaskType::CouncilDeliberation => Candidates {
            preferred: &["claude-3-5-sonnet-20241022", "gpt-4o"],
            fallback: &["claude-3-haiku-20240307"],
        },
        TaskType::StrategyPlanning => Candidates {
            preferred: &["claude-3-5-sonnet-20241022", "gpt-4o"],
            fallback: &["gemini-2.0-flash-exp"],
        },
    }
}

/// Picks a model per task by complexity and cost
#[derive(Debug, Clone, Default)]
pub struct ModelRouter {
    cost_threshold: Option<f64>,
}

impl ModelRouter {
    /// `cost_threshold` is the max acceptable cost per 1M tokens
    pub fn new(cost_threshold: Option<f64>) -> Self {
        Self { cost_threshold }
    }

    pub fn cost_of(model: &str) -> Option<f64> {
        MODEL_COSTS
            .iter()
            .find(|(name, _)| *name == model)
            .map(|(_, cost)| *cost)
    }

    /// Select the model for a task.
    ///
    /// Low complexity (< 0.3) takes the cheapest preferred model; anything else
    /// takes the first preferred one. An empty preferred list (after cost
    /// filtering) falls back.
    pub fn select_model(
        &self,
        task: TaskType,
        complexity_score: f64,
        _latency_sensitive: bool,
    ) -> &'static str {
        let Candidates {
            preferred,
            fallback,
        } = candidates(task);

        let mut preferred: Vec<&'static str> = preferred
            .iter()
            .copied()
            .filter(|m| match self.cost_threshold {
                Some(limit) => Self::cost_of(m).unwrap_or(0.0) <= limit,
                None => true,
            })
            .collect();

        if complexity_score < 0.3 {
            preferred.sort_by(|a, b| {
                let ca = Self::cost_of(a).unwrap_or(0.0);
                let cb = Self::cost_of(b).unwrap_or(0.0);
                ca.total_cmp(&cb)
            });
        }

        preferred.first().copied().unwrap_or(fallback[0])
    }

    /// Estimated dollar cost of a call
    pub fn estimate_cost(model: &str, input_tokens: usize, output_tokens: usize) -> f64 {
        let cost_per_million = Self::cost_of(model).unwrap_or(DEFAULT_MODEL_COST);
        (input_tokens + output_tokens) as f64 / 1_000_000.0 * cost_per_million
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_selects_appropriate_model() {
        let router = ModelRouter::default();

        let model = router.select_model(TaskType::AmbiguityScan, 0.3, false);
        assert!(["claude-3-haiku-20240307", "gpt-4o-mini"].contains(&model));

        let model = router.select_model(TaskType::CouncilDeliberation, 0.9, false);
        assert!(["claude-3-5-sonnet-20241022", "gpt-4o"].contains(&model));

        let model = router.select_model(TaskType::OntologyGeneration, 0.7, false);
        assert!(["claude-3-5-sonnet-20241022", "gemini-2.0-flash-exp"].contains(&model));
    }

    #[test]
    fn test_low_complexity_prefers_cheapest() {
        let router = ModelRouter::default();
        assert_eq!(
            router.select_model(TaskType::OntologyGeneration, 0.1, false),
            "gemini-2.0-flash-exp"
        );
    }

    #[test]
    fn test_router_considers_cost() {
        let router = ModelRouter::new(Some(0.01));
        let model = router.select_model(TaskType::AmbiguityScan, 0.5, false);
        assert!(model.contains("haiku") || model.contains("mini"));

        // Nothing preferred is cheap enough -> fallback
        assert_eq!(
            router.select_model(TaskType::KpiFabrication, 0.5, false),
            "gpt-4o"
        );
    }

    #[test]
    fn test_estimate_cost() {
        let cost = ModelRouter::estimate_cost("gpt-4o", 600_000, 400_000);
        assert!((cost - 0.025).abs() < 1e-12);
        let unknown = ModelRouter::estimate_cost("mystery", 1_000_000, 0);
        assert!((unknown - DEFAULT_MODEL_COST).abs() < 1e-12);
    }
}
