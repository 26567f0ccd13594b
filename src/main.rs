use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

use cogflow::{
    app::load_config,
    cli::{handle_command, Cli},
    runtime::{InteractiveRunner, NonInteractiveRunner},
    models::{ModelFactory, ModelRouter, TaskType},
    session::SessionManager,
    utils::init_logger,
    PipelineOrchestrator,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();
    init_logger(cli.verbose);

    if let Some(command) = &cli.command {
        return handle_command(command, cli.config.as_deref());
    }

    let config = load_config(cli.config.as_deref())?;

    let sessions = Arc::new(SessionManager::from_config(&config.session));
    let reaper = config
        .session
        .sweep_interval()
        .map(|interval| sessions.spawn_reaper(interval));

    if config.stages.use_model {
        let model_id = ModelRouter::new(config.stages.cost_threshold).select_model(
            TaskType::AmbiguityScan,
            0.2,
            false,
        );
        match ModelFactory::validate(model_id, &config.litellm).await {
            Ok(true) => info!(model = model_id, "LiteLLM proxy reachable"),
            Ok(false) => warn!(proxy = %config.litellm.proxy_url, "LiteLLM proxy unreachable; model-backed stages will fail"),
            Err(e) => warn!(error = %e, "Could not check LiteLLM proxy"),
        }
    }

    let orchestrator = Arc::new(PipelineOrchestrator::from_config(&config, Arc::clone(&sessions))?);
    info!(
        use_model = config.stages.use_model,
        memory = config.memory.enabled,
        "Pipeline ready"
    );

    let failed = match cli.prompt {
        Some(prompt) => {
            let runner = NonInteractiveRunner::new(orchestrator, cli.session);
            let result = runner.execute(prompt).await;
            println!("{}", runner.format_result(&result, cli.output_format));
            result.failed
        }
        None => {
            InteractiveRunner::new(orchestrator, cli.session).run().await?;
            false
        }
    };

    if let Some(handle) = reaper {
        handle.abort();
    }

    // Exit with appropriate code
    if failed {
        std::process::exit(1);
    }

    Ok(())
}
