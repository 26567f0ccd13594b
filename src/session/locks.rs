use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-session async lock handle
pub type SessionLock = Arc<AsyncMutex<()>>;

/// Proof that the holder owns a session's lock.
///
/// Dropping it releases the lock, whatever path the turn leaves by.
#[derive(Debug)]
pub struct SessionGuard {
    session_id: String,
    _guard: OwnedMutexGuard<()>,
}

impl SessionGuard {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// Maps session ids to their locks.
///
/// The map sits behind one short-held guard lock. It is only ever taken for a
/// lookup or insert, never across an `.await`, so unrelated sessions never
/// serialize on it.
#[derive(Debug, Default)]
pub struct LockRegistry {
    guard: Mutex<HashMap<String, SessionLock>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the lock for a session in one atomic step
    pub fn resolve(&self, session_id: &str) -> SessionLock {
        let mut locks = self.guard.lock();
        Arc::clone(
            locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        )
    }

    /// Wait for exclusive access to a session
    pub async fn acquire(&self, session_id: &str) -> SessionGuard {
        let lock = self.resolve(session_id);
        SessionGuard {
            session_id: session_id.to_string(),
            _guard: lock.lock_owned().await,
        }
    }

    /// Run `f` with the guard lock held
    pub fn with_guard<R>(&self, f: impl FnOnce(&mut HashMap<String, SessionLock>) -> R) -> R {
        let mut locks = self.guard.lock();
        f(&mut locks)
    }

    /// Whether anyone outside the registry holds or waits on this session's lock
    pub fn is_busy(&self, session_id: &str) -> bool {
        self.with_guard(|locks| locks.get(session_id).is_some_and(lock_in_use))
    }

    pub fn remove(&self, session_id: &str) -> Option<SessionLock> {
        self.guard.lock().remove(session_id)
    }

    pub fn clear(&self) {
        self.guard.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.guard.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard.lock().is_empty()
    }
}

/// A handle is in use if it is referenced outside the map (a holder or a
/// waiter still owns a clone) or is currently locked.
pub(crate) fn lock_in_use(lock: &SessionLock) -> bool {
    Arc::strong_count(lock) > 1 || lock.try_lock().is_err()
}
