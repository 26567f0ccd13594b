/// Session management module - Gateway

mod locks;
mod manager;
mod reaper;
mod state;
mod store;

pub use locks::{LockRegistry, SessionGuard, SessionLock};
pub use manager::SessionManager;
pub use reaper::{SweepReport, TtlReaper};
pub use state::{HistoryEntry, HistoryRecord, Role, Session, SessionMetadata};
pub use store::SessionStore;
