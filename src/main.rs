use anyhow::{Context, Result};
use tracing::{info, warn};
use zangli::{AppState, AssistantService, ZangliConfig, cache, telemetry, web};

fn runtime(workers: usize) -> Result<tokio::runtime::Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    if workers > 0 {
        builder.worker_threads(workers);
    }
    builder
        .enable_all()
        .build()
        .context("Failed to start the tokio runtime")
}

async fn run(config: ZangliConfig) -> Result<()> {
    let _telemetry = telemetry::init(&config.logging, &config.telemetry)?;

    info!(
        version = zangli::VERSION,
        profile = ?config.profile,
        host = %config.server.host,
        port = config.server.port,
        debug = config.server.debug,
        "Starting zangli"
    );

    if config.cache.enabled {
        match cache::init(&config.cache.location) {
            Ok(()) => info!("Answer cache at {}", config.cache.location),
            Err(e) => warn!("Answer cache disabled: {e:#}"),
        }
    }

    let assistant = AssistantService::from_config(&config);
    info!(
        knowledge_entries = assistant.knowledge().len(),
        ai_configured = assistant.is_configured(),
        "Assistant ready"
    );

    let state = AppState::new(config, assistant)?;
    web::serve(state).await
}

fn main() -> Result<()> {
    let config = ZangliConfig::load().context("Failed to load configuration")?;
    runtime(config.server.workers)?.block_on(run(config))
}
