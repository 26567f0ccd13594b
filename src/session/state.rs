use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::{next_stage, Deliberation, DomainOntology, Kpi, Signals, Stage};

/// Who produced a history record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Stage-specific payload of a history record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryEntry {
    Scan {
        score: f64,
        analysis: String,
        content: String,
    },
    Interrogation {
        questions: Vec<String>,
        reasoning: String,
    },
    Ontology {
        domain: String,
        entity_count: usize,
    },
    Kpis {
        count: usize,
    },
    Deliberation {
        synthesis: String,
    },
    Reflection {
        verdict: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub role: Role,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub entry: HistoryEntry,
}

/// Per-conversation state.
///
/// History is append-only: `record` is the only way in. The stage only moves
/// through `advance`, or back to the entry point when new input arrives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    stage: Stage,
    pub input: String,
    history: Vec<HistoryRecord>,
    pub ambiguity_score: f64,
    pub ontology: Option<DomainOntology>,
    pub kpis: Option<Vec<Kpi>>,
    pub deliberation: Option<Deliberation>,
    pub error: Option<String>,
}

impl Session {
    /// Fresh session at the pipeline entry point
    pub fn new(id: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            stage: Stage::ENTRY,
            input: input.into(),
            history: Vec::new(),
            ambiguity_score: 0.0,
            ontology: None,
            kpis: None,
            deliberation: None,
            error: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn history(&self) -> &[HistoryRecord] {
        &self.history
    }

    /// Append a record to the history log
    pub fn record(&mut self, role: Role, entry: HistoryEntry) {
        self.history.push(HistoryRecord {
            role,
            at: Utc::now(),
            entry,
        });
    }

    pub fn signals(&self) -> Signals {
        Signals {
            ambiguity_score: self.ambiguity_score,
            has_error: self.error.is_some(),
        }
    }

    /// Move to the successor stage and return it
    pub fn advance(&mut self) -> Stage {
        self.stage = next_stage(self.stage, &self.signals());
        self.stage
    }

    /// Take new user input; the stage is left where the pipeline put it
    pub(crate) fn accept_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    /// Questions from the most recent interrogation record, if any
    pub fn latest_questions(&self) -> Option<&[String]> {
        self.history.iter().rev().find_map(|r| match &r.entry {
            HistoryEntry::Interrogation { questions, .. } => Some(questions.as_slice()),
            _ => None,
        })
    }
}

/// Bookkeeping used for TTL reclamation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub created_at: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
}

impl SessionMetadata {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            last_access: now,
        }
    }

    /// Refresh last access; never moves backwards
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_access {
            self.last_access = now;
        }
    }

    pub fn idle_for(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.last_access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_session_defaults() {
        let session = Session::new("abc", "hello");
        assert_eq!(session.stage(), Stage::AmbiguityScan);
        assert!(session.history().is_empty());
        assert_eq!(session.ambiguity_score, 0.0);
        assert!(session.ontology.is_none());
    }

    #[test]
    fn test_advance_follows_transitions() {
        let mut session = Session::new("abc", "help");
        session.ambiguity_score = 0.9;
        assert_eq!(session.advance(), Stage::SocraticInterrogation);
        assert_eq!(session.advance(), Stage::AmbiguityScan);
        session.ambiguity_score = 0.2;
        assert_eq!(session.advance(), Stage::OntologyArchitecture);
    }

    #[test]
    fn test_latest_questions_picks_last_interrogation() {
        let mut session = Session::new("abc", "help");
        assert!(session.latest_questions().is_none());
        session.record(
            Role::Assistant,
            HistoryEntry::Interrogation {
                questions: vec!["first?".into()],
                reasoning: String::new(),
            },
        );
        session.record(
            Role::Assistant,
            HistoryEntry::Interrogation {
                questions: vec!["second?".into()],
                reasoning: String::new(),
            },
        );
        assert_eq!(session.latest_questions(), Some(&["second?".to_string()][..]));
    }

    #[test]
    fn test_touch_is_monotonic() {
        let t0 = Utc::now();
        let mut meta = SessionMetadata::new(t0);
        meta.touch(t0 - Duration::seconds(10));
        assert_eq!(meta.last_access, t0);
        meta.touch(t0 + Duration::seconds(10));
        assert_eq!(meta.last_access, t0 + Duration::seconds(10));
        assert_eq!(meta.created_at, t0);
    }

    #[test]
    fn test_history_record_is_tagged() {
        let mut session = Session::new("abc", "help");
        session.record(Role::Assistant, HistoryEntry::Kpis { count: 3 });
        let json = serde_json::to_value(&session.history()[0]).unwrap();
        assert_eq!(json["type"], "kpis");
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["count"], 3);
    }
}
