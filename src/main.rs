use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use esp_sse_ingest::{
    config::Config, db::ReadingStore, ingest::IngestionLoop, stream::HttpStreamSource,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env (ignore error if file absent — env vars may be set externally)
    let _ = dotenvy::dotenv();

    // Status lines are info-level, so show them unless RUST_LOG says otherwise
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    // A failed schema init is not fatal: each append reports its own error
    let store = ReadingStore::open(&config.db_path);
    match store.initialize().await {
        Ok(()) => info!(path = %config.db_path, "Database ready"),
        Err(e) => error!(path = %config.db_path, error = %e, "Database initialisation failed"),
    }

    let source = HttpStreamSource::new(
        config.events_url(),
        config.connect_timeout,
        config.read_timeout,
    )
        .context("failed to build HTTP client")?;
    info!(url = %source.url(), "Streaming sensor data");

    IngestionLoop::new(source, store, config.reconnect_delay)
        .run(shutdown_signal())
        .await
        .close()
        .await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
