//! Standalone alarm worker
//!
//! Drains the shared alarm queue and delivers notifications. Runs separately
//! from the scanner process; several instances may share one queue.

use dotenvy::dotenv;
use std::sync::Arc;
use tickwatch::config::AppConfig;
use tickwatch::core::{AppContext, BoxError, Worker};
use tickwatch::logging;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    dotenv().ok();
    logging::init_logging();

    let config = AppConfig::from_env()?;
    info!("Starting tickwatch alarm worker");
    info!(environment = %config.environment, "Environment");

    let ctx = Arc::new(AppContext::from_config(&config).await?);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = Worker::new(ctx);
    let mut worker_handle = tokio::spawn(async move { worker.run(shutdown_rx).await });

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutting down alarm worker...");
            let _ = shutdown_tx.send(true);
            if let Err(e) = (&mut worker_handle).await {
                error!(error = %e, "Worker task failed");
            }
        }
        result = &mut worker_handle => {
            if let Err(e) = result {
                error!(error = %e, "Worker task failed");
            }
        }
    }

    info!("Alarm worker stopped");
    Ok(())
}
