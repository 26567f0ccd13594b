/// Long-term memory module - Gateway

mod episodic;
mod graph;
mod hybrid;
mod traits;

pub use episodic::EpisodicMemory;
pub use graph::{Entity, Relationship, TemporalKnowledgeGraph};
pub use hybrid::{HybridMemory, SharedMemory};
#[cfg(test)]
pub use traits::MockMemoryBackend;
pub use traits::{MemoryBackend, MemoryMatch, MemoryProvider};
