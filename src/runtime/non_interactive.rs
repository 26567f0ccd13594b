use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::cli::OutputFormat;
use crate::pipeline::{PipelineOrchestrator, TurnRequest, TurnResponse};

/// Result of a non-interactive run
#[derive(Debug, Serialize, Deserialize)]
pub struct NonInteractiveResult {
    /// The prompt that was run as a turn
    pub prompt: String,
    pub response: TurnResponse,
    /// Whether the turn failed
    pub failed: bool,
    /// Execution time in milliseconds
    pub duration_ms: u128,
}

/// Runs a single turn and renders the outcome
pub struct NonInteractiveRunner {
    orchestrator: Arc<PipelineOrchestrator>,
    session_id: String,
}

impl NonInteractiveRunner {
    pub fn new(orchestrator: Arc<PipelineOrchestrator>, session_id: impl Into<String>) -> Self {
        Self {
            orchestrator,
            session_id: session_id.into(),
        }
    }

    /// Execute a single prompt and return the result
    pub async fn execute(&self, prompt: String) -> NonInteractiveResult {
        let start_time = Instant::now();
        let request = TurnRequest::new(self.session_id.clone(), prompt.clone());

        let (response, failed) = match self.orchestrator.process_turn(request).await {
            Ok(response) => (response, false),
            Err(e) => (TurnResponse::failure(&self.session_id, &e), true),
        };

        NonInteractiveResult {
            prompt,
            response,
            failed,
            duration_ms: start_time.elapsed().as_millis(),
        }
    }

    /// Format the result according to the output format
    pub fn format_result(&self, result: &NonInteractiveResult, format: OutputFormat) -> String {
        match format {
            OutputFormat::Json => serde_json::to_string_pretty(result).unwrap_or_else(|e| {
                format!("{{\"error\": \"Failed to serialize result: {}\"}}", e)
            }),
            OutputFormat::Text => render_response(&result.response, result.failed),
        }
    }
}

/// Human-readable rendering shared with the interactive loop
pub fn render_response(response: &TurnResponse, failed: bool) -> String {
    let mut output = String::new();

    let header = format!("[{}]", response.session_id);
    if failed {
        output.push_str(&format!("{} {}\n", header.red(), response.message));
        return output;
    }
    output.push_str(&format!("{} {}\n", header.cyan(), response.message));

    if let Some(score) = response.ambiguity_score {
        output.push_str(&format!("Ambiguity: {:.2}\n", score));
    }

    if let Some(questions) = &response.questions {
        output.push_str(&format!("\n{}\n", "Clarifying questions:".yellow()));
        for (i, question) in questions.iter().enumerate() {
            output.push_str(&format!("  {}. {}\n", i + 1, question));
        }
    }

    if let Some(ontology) = &response.ontology {
        output.push_str(&format!("\nOntology: {}\n", ontology.domain.bold()));
        for entity in &ontology.entities {
            output.push_str(&format!("  • {}: {}\n", entity.kind, entity.description));
        }
    }

    if let Some(kpis) = &response.kpis {
        output.push_str(&format!("\n{}\n", "KPIs:".green()));
        for kpi in kpis {
            output.push_str(&format!("  • {} - {}\n", kpi.name, kpi.description));
        }
    }

    output
}
