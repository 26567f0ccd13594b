use chrono::Utc;
use parking_lot::Mutex;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::processor::StageSet;
use super::stage::Stage;
use super::turn::{validate_session_id, TurnRequest, TurnResponse};
use crate::app::Config;
use crate::memory::{MemoryBackend, MemoryProvider, SharedMemory};
use crate::models::ModelRouter;
use crate::session::{Session, SessionManager};
use crate::utils::CogflowError;

/// Memory handle for one turn. Stays open (and gets closed) even when
/// initialization failed, so teardown is the same on every path.
struct TurnMemory {
    backend: Box<dyn MemoryBackend>,
    available: bool,
}

impl TurnMemory {
    async fn remember(&self, session: &Session) {
        if !self.available {
            return;
        }
        let metadata = json!({
            "session_id": session.id,
            "stage": session.stage(),
            "ambiguity_score": session.ambiguity_score,
        });
        if let Err(e) = self.backend.store(&session.input, metadata).await {
            warn!(session_id = %session.id, error = %e, "Failed to record turn in memory");
        }
    }

    async fn close(self) {
        if let Err(e) = self.backend.close().await {
            warn!(error = %e, "Failed to close memory backend");
        }
    }
}

/// Runs turns and pipeline steps against the session store.
///
/// Every entry point holds the session's lock for its whole read-process-write
/// cycle, so turns on one session never interleave while turns on different
/// sessions run independently.
pub struct PipelineOrchestrator {
    sessions: Arc<SessionManager>,
    stages: StageSet,
    memory: Option<Arc<dyn MemoryProvider>>,
    turn_timeout: Option<Duration>,
}

impl PipelineOrchestrator {
    pub fn new(sessions: Arc<SessionManager>, stages: StageSet) -> Self {
        Self {
            sessions,
            stages,
            memory: None,
            turn_timeout: None,
        }
    }

    pub fn with_memory(mut self, memory: Option<Arc<dyn MemoryProvider>>) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_turn_timeout(mut self, limit: Option<Duration>) -> Self {
        self.turn_timeout = limit;
        self
    }

    /// Wire memory, processors and limits from configuration
    pub fn from_config(config: &Config, sessions: Arc<SessionManager>) -> anyhow::Result<Self> {
        let memory: Option<Arc<dyn MemoryProvider>> = if config.memory.enabled {
            Some(Arc::new(SharedMemory::with_capacity(config.memory.max_episodes)))
        } else {
            None
        };

        let stages = if config.stages.use_model {
            let router = ModelRouter::new(config.stages.cost_threshold);
            StageSet::with_model(&router, &config.litellm, memory.clone())?
        } else {
            StageSet::heuristic(memory.clone())
        };

        Ok(Self::new(sessions, stages)
            .with_memory(memory)
            .with_turn_timeout(config.session.turn_timeout()))
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Process one user turn: scan the input and, when it is too vague, ask
    /// clarifying questions.
    pub async fn process_turn(&self, request: TurnRequest) -> Result<TurnResponse, CogflowError> {
        request.validate()?;
        self.sessions.maybe_sweep(Utc::now());

        let guard = self.sessions.lock(&request.session_id).await;
        debug!(session_id = %request.session_id, "Acquired session lock");

        let session = self
            .sessions
            .store()
            .get_or_init(&guard, &request.input, Utc::now());
        let memory = self.open_memory(&request.session_id).await;

        let reached = Mutex::new(session.stage());
        let outcome = self.bounded(self.run_turn(session, &reached), &reached).await;

        if let (Ok((session, _)), Some(memory)) = (&outcome, &memory) {
            memory.remember(session).await;
        }
        if let Some(memory) = memory {
            memory.close().await;
        }

        match outcome {
            Ok((session, questions)) => {
                info!(
                    session_id = %session.id,
                    stage = %session.stage(),
                    ambiguity_score = session.ambiguity_score,
                    "Processed turn"
                );
                let response = TurnResponse::from_turn(&session, questions);
                self.sessions.store().put(&guard, session);
                Ok(response)
            }
            Err(e) => {
                warn!(session_id = %request.session_id, error = %e, "Turn failed");
                Err(e)
            }
        }
    }

    /// Run the processor for the session's current stage and advance once.
    ///
    /// Scan and interrogation are driven by user turns, so a session waiting
    /// on either is returned unchanged, as is a finished one.
    pub async fn advance_session(&self, session_id: &str) -> Result<TurnResponse, CogflowError> {
        validate_session_id(session_id)?;
        if !self.sessions.store().contains(session_id) {
            return Err(CogflowError::SessionNotFound(session_id.to_string()));
        }

        let guard = self.sessions.lock(session_id).await;
        let Some(session) = self.sessions.store().get(session_id) else {
            // Evicted while we waited
            self.sessions.discard(guard);
            return Err(CogflowError::SessionNotFound(session_id.to_string()));
        };
        self.sessions.store().touch(&guard, Utc::now());

        let stage = session.stage();
        if matches!(
            stage,
            Stage::AmbiguityScan | Stage::SocraticInterrogation | Stage::Done
        ) {
            let mut response = TurnResponse::from_step(&session);
            if !stage.is_terminal() {
                response.message = "Session is waiting for clarifying input".to_string();
            }
            return Ok(response);
        }

        let reached = Mutex::new(stage);
        let mut session = self
            .bounded(self.run_stage(stage, session), &reached)
            .await
            .inspect_err(|e| warn!(session_id = %session_id, error = %e, "Pipeline step failed"))?;
        let next = session.advance();
        info!(session_id = %session_id, from = %stage, to = %next, "Advanced session");

        let response = TurnResponse::from_step(&session);
        self.sessions.store().put(&guard, session);
        Ok(response)
    }

    async fn open_memory(&self, session_id: &str) -> Option<TurnMemory> {
        let backend = self.memory.as_ref()?.open();
        let available = match backend.initialize().await {
            Ok(()) => true,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Memory unavailable, continuing without it");
                false
            }
        };
        Some(TurnMemory { backend, available })
    }

    async fn run_turn(
        &self,
        session: Session,
        reached: &Mutex<Stage>,
    ) -> Result<(Session, Option<Vec<String>>), CogflowError> {
        // Every turn is scanned, but only a session still at the scan moves on;
        // later stages keep their progress and just record the new score.
        let at_scan = session.stage() == Stage::AmbiguityScan;
        let mut session = self.run_stage(Stage::AmbiguityScan, session).await?;
        let mut questions = None;

        if at_scan && session.advance() == Stage::SocraticInterrogation {
            *reached.lock() = Stage::SocraticInterrogation;
            session = self
                .run_stage(Stage::SocraticInterrogation, session)
                .await?;
            questions = session.latest_questions().map(<[String]>::to_vec);
            session.advance();
        }

        Ok((session, questions))
    }

    async fn run_stage(&self, stage: Stage, session: Session) -> Result<Session, CogflowError> {
        let processor = self.stages.for_stage(stage).ok_or_else(|| CogflowError::Stage {
            stage,
            message: "no processor registered".to_string(),
        })?;
        processor
            .process(session)
            .await
            .map_err(|e| CogflowError::stage(stage, e))
    }

    /// Apply the turn timeout, if any; `reached` names the stage on expiry
    async fn bounded<T>(
        &self,
        work: impl Future<Output = Result<T, CogflowError>>,
        reached: &Mutex<Stage>,
    ) -> Result<T, CogflowError> {
        let Some(limit) = self.turn_timeout else {
            return work.await;
        };
        match tokio::time::timeout(limit, work).await {
            Ok(result) => result,
            Err(_) => Err(CogflowError::Timeout {
                stage: *reached.lock(),
                limit,
            }),
        }
    }
}
