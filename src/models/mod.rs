// Gateway module for models - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod factory;
mod parse;
mod router;
mod traits;
mod types;
mod unified;

// Public re-exports - the ONLY way to access model functionality
pub use factory::ModelFactory;
pub use parse::extract_json;
pub use router::{ModelRouter, TaskType};
#[cfg(test)]
pub use traits::MockModel;
pub use traits::Model;
pub use types::{ChatMessage, MessageRole, ModelConfig, ModelResponse, TokenUsage};
pub use unified::UnifiedModel;
