use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cogflow")]
#[command(version)]
#[command(about = "Multi-turn clarification pipeline with per-session state", long_about = None)]
pub struct Cli {
    /// Session to run turns against
    #[arg(short, long, default_value = "default")]
    pub session: String,

    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Non-interactive prompt to run as a single turn
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Output format for non-interactive mode
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, requires = "prompt")]
    pub output_format: OutputFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default configuration file
    Init,
    /// Print the effective configuration
    Config,
    /// Show version information
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    Text,
    /// JSON structured output
    Json,
}
