use anyhow::Result;
use async_trait::async_trait;

use super::processor::StageProcessor;
use super::stage::Stage;
use crate::session::{HistoryEntry, Role, Session};

/// Checks the executed strategy; a rejection sends the pipeline back to planning
pub struct Reflector;

#[async_trait]
impl StageProcessor for Reflector {
    fn stage(&self) -> Stage {
        Stage::Reflection
    }

    async fn process(&self, mut session: Session) -> Result<Session> {
        let verdict = match session.kpis.as_deref() {
            Some(kpis) if !kpis.is_empty() => {
                session.error = None;
                format!("Strategy accepted with {} KPI(s)", kpis.len())
            }
            _ => {
                let reason = "Execution produced no measurable KPIs".to_string();
                session.error = Some(reason.clone());
                format!("Strategy rejected: {}", reason)
            }
        };

        session.record(Role::System, HistoryEntry::Reflection { verdict });
        Ok(session)
    }
}
