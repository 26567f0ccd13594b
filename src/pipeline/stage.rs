use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::AMBIGUITY_THRESHOLD;

/// Pipeline stages, in the order a fully clarified conversation visits them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    AmbiguityScan,
    SocraticInterrogation,
    OntologyArchitecture,
    StrategyPlanning,
    Execution,
    Reflection,
    Done,
}

impl Stage {
    /// Entry point for every conversation
    pub const ENTRY: Stage = Stage::AmbiguityScan;

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::AmbiguityScan => "ambiguity_scan",
            Stage::SocraticInterrogation => "socratic_interrogation",
            Stage::OntologyArchitecture => "ontology_architecture",
            Stage::StrategyPlanning => "strategy_planning",
            Stage::Execution => "execution",
            Stage::Reflection => "reflection",
            Stage::Done => "done",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The slice of session state that control flow depends on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signals {
    pub ambiguity_score: f64,
    pub has_error: bool,
}

/// Pure transition function: exactly one successor for every stage.
pub fn next_stage(current: Stage, signals: &Signals) -> Stage {
    match current {
        Stage::AmbiguityScan => {
            if signals.ambiguity_score > AMBIGUITY_THRESHOLD {
                Stage::SocraticInterrogation
            } else {
                Stage::OntologyArchitecture
            }
        }
        // Re-scan once the user has answered the clarifying questions
        Stage::SocraticInterrogation => Stage::AmbiguityScan,
        Stage::OntologyArchitecture => Stage::StrategyPlanning,
        Stage::StrategyPlanning => Stage::Execution,
        Stage::Execution => Stage::Reflection,
        Stage::Reflection => {
            if signals.has_error {
                Stage::StrategyPlanning
            } else {
                Stage::Done
            }
        }
        Stage::Done => Stage::Done,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(score: f64) -> Signals {
        Signals {
            ambiguity_score: score,
            has_error: false,
        }
    }

    #[test]
    fn test_scan_branches_on_threshold() {
        assert_eq!(
            next_stage(Stage::AmbiguityScan, &signals(0.8)),
            Stage::SocraticInterrogation
        );
        assert_eq!(
            next_stage(Stage::AmbiguityScan, &signals(0.4)),
            Stage::OntologyArchitecture
        );
        // Threshold itself is not "above"
        assert_eq!(
            next_stage(Stage::AmbiguityScan, &signals(AMBIGUITY_THRESHOLD)),
            Stage::OntologyArchitecture
        );
    }

    #[test]
    fn test_transition_is_deterministic() {
        for score in [0.0, 0.4, 0.7, 0.71, 1.0] {
            let s = signals(score);
            assert_eq!(
                next_stage(Stage::AmbiguityScan, &s),
                next_stage(Stage::AmbiguityScan, &s)
            );
        }
    }

    #[test]
    fn test_linear_chain() {
        let s = signals(0.1);
        assert_eq!(next_stage(Stage::SocraticInterrogation, &s), Stage::AmbiguityScan);
        assert_eq!(next_stage(Stage::OntologyArchitecture, &s), Stage::StrategyPlanning);
        assert_eq!(next_stage(Stage::StrategyPlanning, &s), Stage::Execution);
        assert_eq!(next_stage(Stage::Execution, &s), Stage::Reflection);
        assert_eq!(next_stage(Stage::Done, &s), Stage::Done);
    }

    #[test]
    fn test_reflection_replans_on_error() {
        let ok = Signals {
            ambiguity_score: 0.1,
            has_error: false,
        };
        let failed = Signals {
            ambiguity_score: 0.1,
            has_error: true,
        };
        assert_eq!(next_stage(Stage::Reflection, &ok), Stage::Done);
        assert_eq!(next_stage(Stage::Reflection, &failed), Stage::StrategyPlanning);
    }
}
