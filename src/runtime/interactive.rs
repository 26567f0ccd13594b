use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use super::non_interactive::render_response;
use crate::pipeline::{PipelineOrchestrator, TurnRequest, TurnResponse};

/// One line of REPL input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Turn(String),
    Advance,
    State,
    Sessions,
    Sweep,
    Quit,
    Empty,
    Unknown(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match line {
            "" => Self::Empty,
            "/advance" => Self::Advance,
            "/state" => Self::State,
            "/sessions" => Self::Sessions,
            "/sweep" => Self::Sweep,
            "/quit" | "/exit" => Self::Quit,
            cmd if cmd.starts_with('/') => Self::Unknown(cmd.to_string()),
            text => Self::Turn(text.to_string()),
        }
    }
}

/// Line-oriented loop feeding stdin to one session
pub struct InteractiveRunner {
    orchestrator: Arc<PipelineOrchestrator>,
    session_id: String,
}

impl InteractiveRunner {
    pub fn new(orchestrator: Arc<PipelineOrchestrator>, session_id: impl Into<String>) -> Self {
        Self {
            orchestrator,
            session_id: session_id.into(),
        }
    }

    pub async fn run(&self) -> Result<()> {
        println!(
            "{} session {} (/advance /state /sessions /sweep /quit)",
            "cogflow".bold(),
            self.session_id.cyan()
        );

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            match self.handle(ReplCommand::parse(&line)).await {
                Some(output) => print!("{}", output),
                None => break,
            }
        }
        Ok(())
    }

    /// Output for one command; `None` ends the loop
    pub async fn handle(&self, command: ReplCommand) -> Option<String> {
        debug!(session_id = %self.session_id, ?command, "REPL command");
        let output = match command {
            ReplCommand::Quit => return None,
            ReplCommand::Empty => String::new(),
            ReplCommand::Turn(input) => {
                let request = TurnRequest::new(self.session_id.clone(), input);
                render(&self.session_id, self.orchestrator.process_turn(request).await)
            }
            ReplCommand::Advance => render(
                &self.session_id,
                self.orchestrator.advance_session(&self.session_id).await,
            ),
            ReplCommand::State => match self.orchestrator.sessions().session(&self.session_id) {
                Some(session) => serde_json::to_string_pretty(&session)
                    .map(|json| format!("{}\n", json))
                    .unwrap_or_else(|e| format!("Failed to serialize session: {}\n", e)),
                None => format!("No state for session {}\n", self.session_id),
            },
            ReplCommand::Sessions => {
                format!("{} live session(s)\n", self.orchestrator.sessions().session_count())
            }
            ReplCommand::Sweep => {
                let report = self.orchestrator.sessions().sweep(Utc::now());
                format!(
                    "Evicted {}, skipped {} busy\n",
                    report.evicted.len(),
                    report.skipped_busy.len()
                )
            }
            ReplCommand::Unknown(cmd) => format!("{} {}\n", "Unknown command:".yellow(), cmd),
        };
        Some(output)
    }
}

fn render(session_id: &str, outcome: Result<TurnResponse, crate::utils::CogflowError>) -> String {
    match outcome {
        Ok(response) => render_response(&response, false),
        Err(e) => render_response(&TurnResponse::failure(session_id, &e), true),
    }
}
