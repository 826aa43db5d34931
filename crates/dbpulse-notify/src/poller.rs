//! The supervised background poll loop

use crate::service::{ChangeNotificationService, TickOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Default poll period
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Periodically runs [`ChangeNotificationService::tick`] until stopped
///
/// ```rust,ignore
/// let handle = SnapshotPoller::new(service.clone()).interval(Duration::from_secs(2)).start();
/// // ... serve ...
/// handle.stop().await;
/// ```
#[derive(Debug)]
pub struct SnapshotPoller {
    service: Arc<ChangeNotificationService>,
    interval: Duration,
}

impl SnapshotPoller {
    pub fn new(service: Arc<ChangeNotificationService>) -> Self {
        Self {
            service,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the poll period
    ///
    /// # Panics
    ///
    /// Panics if `interval` is zero.
    pub fn interval(mut self, interval: Duration) -> Self {
        assert!(!interval.is_zero(), "poll interval must be non-zero");
        self.interval = interval;
        self
    }

    /// Spawn the poll loop. The first tick runs immediately.
    pub fn start(self) -> PollerHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        info!(interval_ms = self.interval.as_millis() as u64, "Snapshot poller started");
        let task = tokio::spawn(self.run(shutdown_rx));
        PollerHandle {
            shutdown_tx: Some(shutdown_tx),
            task,
        }
    }

    async fn run(self, mut shutdown_rx: oneshot::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown_rx => {
                    debug!("Snapshot poller shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    // each tick runs as its own task so a panic is contained to that tick
                    let service = self.service.clone();
                    match tokio::spawn(async move { service.tick().await }).await {
                        Ok(Ok(TickOutcome::Unchanged)) => {}
                        Ok(Ok(outcome)) => debug!(?outcome, "Poll tick"),
                        Ok(Err(err)) => warn!(error = %err, "Poll tick skipped"),
                        Err(err) => error!(error = %err, "Poll tick aborted"),
                    }
                }
            }
        }
    }
}

/// Stop hook for a running [`SnapshotPoller`]
#[derive(Debug)]
pub struct PollerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Signal the loop to stop and wait for it. A tick in progress completes first.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(err) = (&mut self.task).await {
            error!(error = %err, "Snapshot poller task failed");
        }
        info!("Snapshot poller stopped");
    }

    /// Whether the loop has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
