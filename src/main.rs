use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sensor_gateway::config::LogFormat;
use sensor_gateway::{
    AppState, Config, MemoryQueue, MemoryStore, MongoStore, ReadingQueue, ReadingStore,
    RedisQueue, StorageBackend, build_router, metrics, utils,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::from_env();

    init_tracing(config.as_ref().map_or(LogFormat::Pretty, |c| c.log_format));

    info!(
        "Starting Sensor Gateway v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {e}");
            return ExitCode::from(exitcode::CONFIG as u8);
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(exit_code) => ExitCode::from(exit_code as u8),
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .init(),
    }
}

/// Run the application, returning an exit code on error.
async fn run(config: Config) -> Result<(), exitcode::ExitCode> {
    info!(
        host = %config.host,
        port = %config.port,
        backend = ?config.storage_backend,
        development = config.development,
        relay = config.relay_enabled(),
        "Configuration loaded"
    );

    if let Some(addr) = config.metrics_addr() {
        metrics::try_init_metrics(addr);
    }

    let (queue, store) = connect_backends(&config).await?;
    info!(
        queue = queue.backend(),
        store = store.backend(),
        queue_ready = queue.is_ready(),
        "Backing stores initialized"
    );
    if !queue.is_ready() {
        warn!("Starting degraded: ingestion returns 503 until the queue store answers");
    }

    let addr: SocketAddr = config.server_addr().parse().map_err(|e| {
        error!("Invalid server address: {e}");
        exitcode::CONFIG
    })?;

    let state = AppState::new(queue, store, config).map_err(|e| {
        error!("Failed to build application state: {e}");
        exitcode::CONFIG
    })?;
    let app = build_router(state.clone());

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to {addr}: {e}");
        exitcode::UNAVAILABLE
    })?;

    info!("Server listening on http://{addr}");
    info!("API endpoints:");
    info!("  GET  /health                       - Queue store health");
    info!("  POST /api/sensor-data              - Submit a reading");
    info!("  GET  /api/sensor-data/all          - Recent readings");
    info!("  GET  /api/sensor-data/{{sensor_id}}  - Recent readings for a sensor");
    info!("  GET  /api/diagnostic               - Document store diagnostics");

    axum::serve(listener, app)
        .with_graceful_shutdown(utils::shutdown_signal())
        .await
        .map_err(|e| {
            error!("Server error: {e}");
            exitcode::SOFTWARE
        })?;

    info!("HTTP server stopped, shutting down background tasks...");
    state.shutdown().await;

    info!("Server shutdown complete");
    Ok(())
}

async fn connect_backends(
    config: &Config,
) -> Result<(Arc<dyn ReadingQueue>, Arc<dyn ReadingStore>), exitcode::ExitCode> {
    match config.storage_backend {
        StorageBackend::Memory => {
            warn!("Using in-memory queue and store; nothing is persisted");
            Ok((Arc::new(MemoryQueue::new()), Arc::new(MemoryStore::new())))
        }
        StorageBackend::External => {
            let queue = RedisQueue::connect(config).await.map_err(|e| {
                error!("Failed to set up Redis queue: {e}");
                exitcode::CONFIG
            })?;
            let store = MongoStore::connect(config).await;
            Ok((Arc::new(queue), Arc::new(store)))
        }
    }
}
