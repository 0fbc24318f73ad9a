use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::oneshot;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use washboard::config::LoggingConfig;
use washboard::Config;
use washboard::Engine;
use washboard::HttpRemote;

/// Laundry appliance reservation display
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Config file. Defaults to ./washboard.toml when present.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL of the laundry status service
    #[arg(long, env = "WASHBOARD_API_URL")]
    api_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?.with_api_url(cli.api_url);
    config.validate()?;

    init_logging(&config.logging);

    tracing::info!("washboard {} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!("Using status service at {}", config.remote.base_url);

    let remote = HttpRemote::new(&config.remote.base_url, config.request_timeout())
        .context("Failed to build HTTP client")?;
    let remote_url = remote.base_url().to_string();

    let engine = Engine::new(Arc::new(remote), config.engine_settings());
    let handle = engine.handle();
    let (engine_shutdown_tx, engine_shutdown_rx) = oneshot::channel();
    let engine_task = tokio::spawn(engine.run(engine_shutdown_rx));

    let (api_shutdown_tx, api_shutdown_rx) = oneshot::channel();
    let mut api_task = tokio::spawn(washboard::api::serve(
        config.api.listen.clone(),
        config.api.port,
        handle,
        remote_url,
        api_shutdown_rx,
    ));

    tracing::info!("Press Ctrl+C to exit");

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            match result {
                Ok(()) => tracing::info!("Received shutdown signal"),
                Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
            }
            api_shutdown_tx.send(()).ok();
            match (&mut api_task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!("HTTP API server failed: {:#}", e),
                Err(e) => tracing::error!("HTTP API task failed: {}", e),
            }
        }
        result = &mut api_task => {
            match result {
                Ok(Ok(())) => tracing::warn!("HTTP API server exited"),
                Ok(Err(e)) => tracing::error!("HTTP API server failed: {:#}", e),
                Err(e) => tracing::error!("HTTP API task failed: {}", e),
            }
        }
    }

    engine_shutdown_tx.send(()).ok();
    if let Err(e) = engine_task.await {
        tracing::error!("Engine task failed: {}", e);
    }

    tracing::info!("washboard shutdown complete");

    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(logging.filter())
        .init();
}
