use dbpulse::{build_app, init_logging, AppState, Config};
use dbpulse_notify::SnapshotPoller;
use dbpulse_store::SqliteStore;
use std::sync::Arc;
use tracing::{error, info};

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Failed to listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::load()?;
    init_logging(&config.log_filter);

    let store = SqliteStore::connect(&config.database_url).await?;
    let state = AppState::new(Arc::new(store), &config);

    let poller = SnapshotPoller::new(state.notifier.clone())
        .interval(config.poll_interval())
        .start();

    info!(addr = %config.bind_addr, "Starting dbpulse");
    let served = build_app(state)
        .run_with_shutdown(&config.bind_addr, shutdown_signal())
        .await;

    poller.stop().await;
    served?;
    Ok(())
}
