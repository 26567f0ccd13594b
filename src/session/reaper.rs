use chrono::{DateTime, Utc};
use std::time::Duration;

use super::locks::{lock_in_use, LockRegistry};
use super::store::SessionStore;

/// Outcome of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub evicted: Vec<String>,
    /// Idle sessions left alone because a turn still holds or awaits their lock
    pub skipped_busy: Vec<String>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.evicted.is_empty() && self.skipped_busy.is_empty()
    }
}

/// Evicts sessions idle for longer than the TTL.
#[derive(Debug, Clone)]
pub struct TtlReaper {
    ttl: chrono::Duration,
    probability: f64,
}

impl TtlReaper {
    pub fn new(ttl: Duration, probability: f64) -> Self {
        Self {
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            probability: probability.clamp(0.0, 1.0),
        }
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    /// Coin flip deciding whether an arriving turn pays for a sweep
    pub fn should_sweep(&self) -> bool {
        self.probability > 0.0 && rand::random::<f64>() < self.probability
    }

    /// Remove every session whose idle time exceeds the TTL.
    ///
    /// The registry guard is held for the whole pass, so no turn can resolve a
    /// lock for an id while it is being torn down. State, metadata and lock go
    /// together. Sessions whose lock is in use are skipped.
    pub fn sweep(
        &self,
        locks: &LockRegistry,
        store: &SessionStore,
        now: DateTime<Utc>,
    ) -> SweepReport {
        let mut report = SweepReport::default();

        locks.with_guard(|held| {
            for id in store.idle_ids(now, self.ttl) {
                if held.get(&id).is_some_and(lock_in_use) {
                    report.skipped_busy.push(id);
                    continue;
                }
                held.remove(&id);
                store.remove(&id);
                report.evicted.push(id);
            }
        });

        report
    }
}
