use serde::{Deserialize, Serialize};

use super::artifacts::{DomainOntology, Kpi};
use crate::constants::{MAX_INPUT_BYTES, MAX_SESSION_ID_LEN};
use crate::session::Session;
use crate::utils::CogflowError;

/// One user turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRequest {
    pub input: String,
    pub session_id: String,
}

impl TurnRequest {
    pub fn new(session_id: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            session_id: session_id.into(),
        }
    }

    /// Reject malformed requests before any lock is taken
    pub fn validate(&self) -> Result<(), CogflowError> {
        validate_session_id(&self.session_id)?;
        if self.input.trim().is_empty() {
            return Err(CogflowError::InvalidRequest("input is empty".to_string()));
        }
        if self.input.len() > MAX_INPUT_BYTES {
            return Err(CogflowError::InvalidRequest(format!(
                "input exceeds {} bytes",
                MAX_INPUT_BYTES
            )));
        }
        Ok(())
    }
}

pub fn validate_session_id(session_id: &str) -> Result<(), CogflowError> {
    if session_id.is_empty() {
        return Err(CogflowError::InvalidRequest(
            "session_id is empty".to_string(),
        ));
    }
    if session_id.chars().count() > MAX_SESSION_ID_LEN {
        return Err(CogflowError::InvalidRequest(format!(
            "session_id exceeds {} characters",
            MAX_SESSION_ID_LEN
        )));
    }
    if session_id.chars().any(char::is_control) {
        return Err(CogflowError::InvalidRequest(
            "session_id contains control characters".to_string(),
        ));
    }
    Ok(())
}

/// What a caller sees after a turn or pipeline step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResponse {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ambiguity_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ontology: Option<DomainOntology>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kpis: Option<Vec<Kpi>>,
    pub message: String,
}

impl TurnResponse {
    /// Response for a completed turn; `questions` are only those asked this turn
    pub fn from_turn(session: &Session, questions: Option<Vec<String>>) -> Self {
        Self {
            session_id: session.id.clone(),
            ambiguity_score: Some(session.ambiguity_score),
            questions,
            ontology: None,
            kpis: None,
            message: "Input processed successfully".to_string(),
        }
    }

    /// Response for a pipeline step, carrying whatever artifacts exist so far
    pub fn from_step(session: &Session) -> Self {
        Self {
            session_id: session.id.clone(),
            ambiguity_score: Some(session.ambiguity_score),
            questions: None,
            ontology: session.ontology.clone(),
            kpis: session.kpis.clone(),
            message: format!("Session is at {}", session.stage()),
        }
    }

    /// Generic failure shown to clients. Internal detail stays in the logs
    /// unless the caller was at fault.
    pub fn failure(session_id: impl Into<String>, err: &CogflowError) -> Self {
        let message = if err.is_client_error() {
            err.to_string()
        } else {
            "Failed to process input".to_string()
        };
        Self {
            session_id: session_id.into(),
            ambiguity_score: None,
            questions: None,
            ontology: None,
            kpis: None,
            message,
        }
    }
}
