use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored memory returned by retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMatch {
    pub content: String,
    pub metadata: Value,
}

/// Long-term memory as seen by the pipeline.
///
/// `initialize` must be idempotent. `close` is always called once a turn is
/// done with the handle, even when `initialize` failed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MemoryBackend: Send + Sync {
    async fn initialize(&self) -> Result<()>;

    async fn close(&self) -> Result<()>;

    async fn store(&self, content: &str, metadata: Value) -> Result<()>;

    /// Up to `k` matches, best first
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<MemoryMatch>>;
}

/// Hands out one backend handle per turn
pub trait MemoryProvider: Send + Sync {
    fn open(&self) -> Box<dyn MemoryBackend>;
}
