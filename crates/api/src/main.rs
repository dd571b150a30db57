//! adminsync-drainer - background delivery of queued admin entity syncs.

use adminsync_api::{logging, AppContext};
use anyhow::Context;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    logging::init();

    match dotenv {
        Ok(path) => info!("Loaded .env from: {:?}", path),
        Err(e) => warn!("Could not load .env file: {}", e),
    }

    let ctx = AppContext::new().context("failed to initialize application context")?;
    ctx.start().await.context("failed to start drain worker")?;

    info!(
        interval_secs = ctx.config.drain.interval_secs,
        batch_size = ctx.config.drain.batch_size,
        "adminsync-drainer running"
    );

    tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;

    info!("Shutdown signal received");
    ctx.shutdown().await.context("failed to stop drain worker")?;

    Ok(())
}
