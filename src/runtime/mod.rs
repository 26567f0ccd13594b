/// Runtime module - Gateway for the run modes
mod interactive;
mod non_interactive;

pub use interactive::{InteractiveRunner, ReplCommand};
pub use non_interactive::{render_response, NonInteractiveResult, NonInteractiveRunner};
