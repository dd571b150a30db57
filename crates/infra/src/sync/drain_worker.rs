//! Background worker that drains the outbox on a fixed cadence.
//!
//! Each tick runs one [`OutboxDrainer::drain_once`] pass under a processing
//! timeout, then purges SENT records older than the retention window. Join
//! handles are tracked and cancellation is explicit.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use adminsync_core::{OutboxDrainer, OutboxStore};
//! use adminsync_infra::sync::{DrainWorker, DrainWorkerConfig};
//!
//! # async fn example(drainer: Arc<OutboxDrainer>, outbox: Arc<dyn OutboxStore>) {
//! let mut worker = DrainWorker::new(drainer, outbox, DrainWorkerConfig::default());
//!
//! worker.start().expect("worker starts");
//! // ... application runs ...
//! worker.stop().await.expect("worker stops");
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use adminsync_core::{Clock, DrainReport, OutboxDrainer, OutboxStore, SystemClock};
use adminsync_domain::{DrainConfig, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::errors::WorkerError;

/// Configuration for the drain worker.
#[derive(Debug, Clone)]
pub struct DrainWorkerConfig {
    /// Interval between drain passes
    pub poll_interval: Duration,
    /// Timeout for a single tick (drain plus purge)
    pub processing_timeout: Duration,
    /// Join timeout when stopping
    pub join_timeout: Duration,
    /// SENT records older than this are purged
    pub sent_retention: Duration,
}

impl Default for DrainWorkerConfig {
    fn default() -> Self {
        Self::from(&DrainConfig::default())
    }
}

impl From<&DrainConfig> for DrainWorkerConfig {
    fn from(config: &DrainConfig) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.interval_secs),
            processing_timeout: Duration::from_secs(300),
            join_timeout: Duration::from_secs(5),
            sent_retention: Duration::from_secs(config.sent_retention_secs),
        }
    }
}

/// Result of one worker tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub drain: DrainReport,
    /// SENT records archived this tick.
    pub purged: usize,
}

/// Shared state moved into the background task.
#[derive(Clone)]
struct TickContext {
    drainer: Arc<OutboxDrainer>,
    outbox: Arc<dyn OutboxStore>,
    clock: Arc<dyn Clock>,
    sent_retention: Duration,
}

impl TickContext {
    async fn tick(&self) -> Result<TickSummary> {
        let drain = self.drainer.drain_once().await?;

        if drain.exhausted > 0 {
            warn!(exhausted = drain.exhausted, "Outbox records reached max attempts");
        }

        let retention = chrono::Duration::from_std(self.sent_retention)
            .unwrap_or_else(|_| chrono::Duration::days(36_500));
        let cutoff = self.clock.now() - retention;

        let purged = match self.outbox.purge_sent(cutoff).await {
            Ok(purged) => purged,
            Err(err) => {
                warn!(error = %err, "Failed to purge sent outbox records");
                0
            }
        };
        if purged > 0 {
            debug!(purged, "Purged sent outbox records");
        }

        Ok(TickSummary { drain, purged })
    }
}

/// Drain worker with explicit lifecycle management.
pub struct DrainWorker {
    context: TickContext,
    config: DrainWorkerConfig,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl DrainWorker {
    /// Create a new worker; nothing runs until [`DrainWorker::start`].
    pub fn new(
        drainer: Arc<OutboxDrainer>,
        outbox: Arc<dyn OutboxStore>,
        config: DrainWorkerConfig,
    ) -> Self {
        let context = TickContext {
            drainer,
            outbox,
            clock: Arc::new(SystemClock),
            sent_retention: config.sent_retention,
        };
        Self { context, config, cancellation: CancellationToken::new(), task_handle: None }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.context.clock = clock;
        self
    }

    /// Run one tick inline, outside the background loop.
    pub async fn tick(&self) -> Result<TickSummary> {
        self.context.tick().await
    }

    /// Start the worker, spawning the background processing task.
    ///
    /// Must be called from within a Tokio runtime.
    #[instrument(skip(self))]
    pub fn start(&mut self) -> std::result::Result<(), WorkerError> {
        if self.is_running() {
            return Err(WorkerError::AlreadyRunning);
        }

        info!(poll_interval_ms = self.config.poll_interval.as_millis() as u64, "Starting drain worker");

        self.cancellation = CancellationToken::new();

        let context = self.context.clone();
        let poll_interval = self.config.poll_interval;
        let processing_timeout = self.config.processing_timeout;
        let cancel = self.cancellation.clone();

        let handle = tokio::spawn(async move {
            Self::process_loop(context, poll_interval, processing_timeout, cancel).await;
        });

        self.task_handle = Some(handle);
        info!("Drain worker started");

        Ok(())
    }

    /// Stop the worker and wait for the processing task to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> std::result::Result<(), WorkerError> {
        if !self.is_running() {
            return Err(WorkerError::NotRunning);
        }

        info!("Stopping drain worker");

        self.cancellation.cancel();

        if let Some(handle) = self.task_handle.take() {
            let join_timeout = self.config.join_timeout;
            match tokio::time::timeout(join_timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("Worker task panicked: {}", e);
                    return Err(WorkerError::TaskPanicked(e.to_string()));
                }
                Err(_) => {
                    warn!("Worker task did not complete within timeout");
                    return Err(WorkerError::JoinTimeout { seconds: join_timeout.as_secs() });
                }
            }
        }

        info!("Drain worker stopped");
        self.cancellation = CancellationToken::new();

        Ok(())
    }

    /// Returns true when a worker instance is active.
    pub fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    /// Background processing loop.
    async fn process_loop(
        context: TickContext,
        poll_interval: Duration,
        processing_timeout: Duration,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Drain worker process loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(poll_interval) => {
                    let started = Instant::now();

                    match tokio::time::timeout(processing_timeout, context.tick()).await {
                        Ok(Ok(summary)) => {
                            debug!(
                                picked = summary.drain.picked,
                                purged = summary.purged,
                                elapsed_ms = started.elapsed().as_millis() as u64,
                                "Drain tick complete"
                            );
                        }
                        Ok(Err(e)) => {
                            error!(error = %e, "Drain tick failed");
                        }
                        Err(_) => {
                            warn!(timeout_secs = processing_timeout.as_secs(), "Drain tick timed out");
                        }
                    }
                }
            }
        }
    }
}

impl Drop for DrainWorker {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("DrainWorker dropped while running; cancelling tasks");
            self.cancellation.cancel();
        }
    }
}
