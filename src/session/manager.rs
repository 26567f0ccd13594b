use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::locks::{LockRegistry, SessionGuard};
use super::reaper::{SweepReport, TtlReaper};
use super::state::{Session, SessionMetadata};
use super::store::SessionStore;
use crate::app::SessionConfig;

/// Owns every piece of shared session state: locks, conversation state and
/// access metadata. Built once and handed to whatever processes turns.
#[derive(Debug)]
pub struct SessionManager {
    locks: LockRegistry,
    store: SessionStore,
    reaper: TtlReaper,
}

impl SessionManager {
    pub fn new(ttl: Duration, sweep_probability: f64) -> Self {
        Self {
            locks: LockRegistry::new(),
            store: SessionStore::new(),
            reaper: TtlReaper::new(ttl, sweep_probability),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.ttl(), config.sweep_probability)
    }

    /// Wait for exclusive access to a session
    pub async fn lock(&self, session_id: &str) -> SessionGuard {
        self.locks.acquire(session_id).await
    }

    pub fn locks(&self) -> &LockRegistry {
        &self.locks
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn reaper(&self) -> &TtlReaper {
        &self.reaper
    }

    /// Snapshot of a session's state
    pub fn session(&self, session_id: &str) -> Option<Session> {
        self.store.get(session_id)
    }

    pub fn metadata(&self, session_id: &str) -> Option<SessionMetadata> {
        self.store.metadata(session_id)
    }

    pub fn session_count(&self) -> usize {
        self.store.len()
    }

    /// Evict expired sessions as of `now`
    pub fn sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let report = self.reaper.sweep(&self.locks, &self.store, now);
        if !report.is_empty() {
            info!(
                evicted = report.evicted.len(),
                skipped_busy = report.skipped_busy.len(),
                remaining = self.store.len(),
                "Swept idle sessions"
            );
        }
        report
    }

    /// Sweep on a small random fraction of calls
    pub fn maybe_sweep(&self, now: DateTime<Utc>) -> Option<SweepReport> {
        self.reaper.should_sweep().then(|| self.sweep(now))
    }

    /// Administrative delete of one session, regardless of idle time.
    ///
    /// Takes the registry guard like the reaper does, and refuses sessions
    /// with a turn in flight.
    pub fn evict(&self, session_id: &str) -> bool {
        let evicted = self.locks.with_guard(|held| {
            if held.get(session_id).is_some_and(super::locks::lock_in_use) {
                return false;
            }
            held.remove(session_id);
            self.store.remove(session_id)
        });
        if evicted {
            debug!(session_id = %session_id, "Evicted session");
        }
        evicted
    }

    /// Release a guard for a session that no longer has state, dropping its
    /// lock entry if nobody else is waiting on it
    pub fn discard(&self, guard: SessionGuard) {
        let session_id = guard.session_id().to_string();
        drop(guard);
        self.locks.with_guard(|held| {
            let orphaned = !self.store.contains(&session_id)
                && !held.get(&session_id).is_some_and(super::locks::lock_in_use);
            if orphaned {
                held.remove(&session_id);
            }
        });
    }

    /// Drop everything; for tests and shutdown
    pub fn clear(&self) {
        self.locks.with_guard(|held| {
            held.clear();
            self.store.clear();
        });
    }

    /// Sweep on a fixed interval instead of (or alongside) the random trigger.
    ///
    /// The task runs until the runtime shuts down or the handle is aborted.
    pub fn spawn_reaper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                manager.sweep(Utc::now());
            }
        })
    }
}
