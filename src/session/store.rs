use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, error};

use super::locks::SessionGuard;
use super::state::{Session, SessionMetadata};

/// Conversation state and access metadata, keyed by session id.
///
/// Writes require the caller's `SessionGuard` for the same id, so a turn can
/// only mutate the session it has locked. The internal maps are guarded by
/// short-held mutexes that are never held across an `.await`.
#[derive(Debug, Default)]
pub struct SessionStore {
    states: Mutex<HashMap<String, Session>>,
    metadata: Mutex<HashMap<String, SessionMetadata>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the session for a turn, creating it on first touch.
    ///
    /// An existing session takes the new input and keeps its stage. Either
    /// way last-access is refreshed to `now`.
    pub fn get_or_init(&self, guard: &SessionGuard, input: &str, now: DateTime<Utc>) -> Session {
        let id = guard.session_id();

        let session = {
            let mut states = self.states.lock();
            match states.get_mut(id) {
                Some(existing) => {
                    existing.accept_input(input);
                    existing.clone()
                }
                None => {
                    debug!(session_id = %id, "Creating session");
                    let fresh = Session::new(id, input);
                    states.insert(id.to_string(), fresh.clone());
                    fresh
                }
            }
        };

        self.metadata
            .lock()
            .entry(id.to_string())
            .and_modify(|meta| meta.touch(now))
            .or_insert_with(|| SessionMetadata::new(now));

        session
    }

    /// Replace the stored state for the guarded session
    pub fn put(&self, guard: &SessionGuard, session: Session) {
        if guard.session_id() != session.id {
            debug_assert!(false, "guard for {} used to write {}", guard.session_id(), session.id);
            error!(
                guard = %guard.session_id(),
                session_id = %session.id,
                "Refusing to store a session under another session's lock"
            );
            return;
        }
        self.states.lock().insert(session.id.clone(), session);
    }

    /// Refresh last-access without touching state
    pub fn touch(&self, guard: &SessionGuard, now: DateTime<Utc>) {
        if let Some(meta) = self.metadata.lock().get_mut(guard.session_id()) {
            meta.touch(now);
        }
    }

    /// Snapshot of a session's state
    pub fn get(&self, session_id: &str) -> Option<Session> {
        self.states.lock().get(session_id).cloned()
    }

    pub fn metadata(&self, session_id: &str) -> Option<SessionMetadata> {
        self.metadata.lock().get(session_id).copied()
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.states.lock().contains_key(session_id)
    }

    /// Ids idle for strictly longer than `ttl` as of `now`
    pub fn idle_ids(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> Vec<String> {
        self.metadata
            .lock()
            .iter()
            .filter(|(_, meta)| meta.idle_for(now) > ttl)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Drop state and metadata for a session; true if anything was removed
    pub fn remove(&self, session_id: &str) -> bool {
        let had_state = self.states.lock().remove(session_id).is_some();
        let had_meta = self.metadata.lock().remove(session_id).is_some();
        had_state || had_meta
    }

    pub fn clear(&self) {
        self.states.lock().clear();
        self.metadata.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.states.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Stage;
    use crate::session::locks::LockRegistry;
    use chrono::Duration;

    #[tokio::test]
    async fn test_first_touch_creates_default_state() {
        let locks = LockRegistry::new();
        let store = SessionStore::new();
        let now = Utc::now();

        let guard = locks.acquire("s1").await;
        let session = store.get_or_init(&guard, "hello", now);

        assert_eq!(session.id, "s1");
        assert_eq!(session.input, "hello");
        assert_eq!(session.stage(), Stage::AmbiguityScan);
        assert!(session.history().is_empty());

        let meta = store.metadata("s1").unwrap();
        assert_eq!(meta.created_at, now);
        assert_eq!(meta.last_access, now);
    }

    #[tokio::test]
    async fn test_existing_session_takes_new_input_and_refreshes_access() {
        let locks = LockRegistry::new();
        let store = SessionStore::new();
        let t0 = Utc::now();
        let t1 = t0 + Duration::seconds(5);

        let guard = locks.acquire("s1").await;
        let mut session = store.get_or_init(&guard, "first", t0);
        session.ambiguity_score = 0.3;
        session.advance();
        store.put(&guard, session);

        let session = store.get_or_init(&guard, "second", t1);
        assert_eq!(session.input, "second");
        assert_eq!(session.ambiguity_score, 0.3);
        assert_eq!(session.stage(), Stage::OntologyArchitecture);

        let meta = store.metadata("s1").unwrap();
        assert_eq!(meta.created_at, t0);
        assert_eq!(meta.last_access, t1);
    }

    #[tokio::test]
    async fn test_put_replaces_state() {
        let locks = LockRegistry::new();
        let store = SessionStore::new();

        let guard = locks.acquire("s1").await;
        let mut session = store.get_or_init(&guard, "x", Utc::now());
        session.error = Some("boom".into());
        store.put(&guard, session);

        assert_eq!(store.get("s1").unwrap().error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_idle_ids_and_remove() {
        let locks = LockRegistry::new();
        let store = SessionStore::new();
        let t0 = Utc::now();

        let old = locks.acquire("old").await;
        store.get_or_init(&old, "x", t0);
        let new = locks.acquire("new").await;
        store.get_or_init(&new, "x", t0 + Duration::minutes(10));

        let now = t0 + Duration::minutes(11);
        let idle = store.idle_ids(now, Duration::minutes(5));
        assert_eq!(idle, vec!["old".to_string()]);
        // Idle for exactly the TTL is not yet expired
        assert!(store.idle_ids(now, Duration::minutes(11)).is_empty());

        assert!(store.remove("old"));
        assert!(!store.remove("old"));
        assert_eq!(store.len(), 1);
    }
}
