use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use contrib_wall::{Config, RosterPipeline, RunOutcome};

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "contrib_wall=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let pipeline = match RosterPipeline::from_config(&config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("Failed to initialize forge client: {e}");
            return ExitCode::FAILURE;
        }
    };

    match pipeline.run(&config.repo).await {
        Ok(summary) => {
            match summary.outcome {
                RunOutcome::Rendered { path, .. } => {
                    info!("Wrote {} contributors to {}", summary.contributors, path.display());
                }
                RunOutcome::Unchanged => info!("Contributor order unchanged for {}", config.repo),
                RunOutcome::Empty => info!("No contributors found for {}", config.repo),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(stage = %e.stage, "Run failed: {e}");
            ExitCode::FAILURE
        }
    }
}
