//! tickwatch
//!
//! Single-process deployment: HTTP surface, scan scheduler and alarm worker.

use dotenvy::dotenv;
use std::sync::Arc;
use tickwatch::config::AppConfig;
use tickwatch::core::http::{start_server, AppState};
use tickwatch::core::{AppContext, BoxError, ScanScheduler, Scanner, Worker};
use tickwatch::logging;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    dotenv().ok();
    logging::init_logging();

    let config = AppConfig::from_env()?;
    info!("Starting tickwatch");
    info!(environment = %config.environment, "Environment");
    info!(port = config.port, "HTTP Server: http://0.0.0.0:{}", config.port);

    let ctx = Arc::new(AppContext::from_config(&config).await?);

    let state = AppState::new(ctx.metrics.clone());
    let port = config.port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(port, state).await {
            error!(error = %e, "HTTP server error");
        }
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = Worker::new(ctx.clone());
    let worker_handle = tokio::spawn(async move { worker.run(shutdown_rx).await });

    let scanner = Arc::new(Scanner::new(ctx.clone()));
    let scheduler = ScanScheduler::new(scanner, config.scan.clone(), ctx.metrics.clone());
    scheduler.start().await;

    info!("tickwatch started, waiting for shutdown signal...");
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutting down tickwatch...");
        }
        _ = server_handle => {
            error!("HTTP server stopped");
        }
    }

    scheduler.stop().await;
    let _ = shutdown_tx.send(true);
    if let Err(e) = worker_handle.await {
        error!(error = %e, "Worker task failed");
    }
    info!("tickwatch stopped");

    Ok(())
}
