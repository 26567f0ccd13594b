pub mod app;
pub mod cli;
pub mod constants;
pub mod memory;
pub mod models;
pub mod pipeline;
pub mod runtime;
pub mod session;
pub mod utils;

pub use app::{load_config, Config};
pub use pipeline::{PipelineOrchestrator, Stage, TurnRequest, TurnResponse};
pub use session::SessionManager;
pub use utils::CogflowError;
