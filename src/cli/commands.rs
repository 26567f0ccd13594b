use anyhow::Result;
use colored::Colorize;

use std::path::Path;

use crate::app::{init_config, load_config};

use super::Commands;

/// Handle CLI subcommands
pub fn handle_command(command: &Commands, config_path: Option<&Path>) -> Result<()> {
    match command {
        Commands::Init => {
            match init_config()? {
                Some(path) => println!("{} {}", "Wrote".green(), path.display()),
                None => println!("Configuration already exists, leaving it untouched"),
            }
            Ok(())
        }
        Commands::Config => {
            let config = load_config(config_path)?;
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Version => {
            show_version();
            Ok(())
        }
    }
}

/// Show version information
pub fn show_version() {
    println!("cogflow v{}", env!("CARGO_PKG_VERSION"));
    println!("   Multi-turn clarification pipeline with per-session state");
}
