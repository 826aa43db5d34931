//! Orchestration of snapshot reads, change detection and broadcast

use crate::error::Result;
use crate::snapshot::Snapshot;
use dbpulse_store::RecordStore;
use dbpulse_ws::{BroadcastReport, Broadcaster};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// The last snapshot clients were told about
///
/// Moves from `Unset` to `Set` once and never back.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Retained {
    Unset,
    Set(Snapshot),
}

/// What a poll tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The records match the retained snapshot
    Unchanged,
    /// First observation recorded without notifying anyone
    Initialized,
    /// A new snapshot was retained and broadcast
    Broadcast(BroadcastReport),
}

/// What a write-triggered notification did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notified {
    /// The records as read right after the write; the rows clients were told about
    pub snapshot: Snapshot,
    /// `None` when a poll tick had already announced this exact snapshot
    pub report: Option<BroadcastReport>,
}

/// Ties the record store, the retained snapshot and the broadcaster together
///
/// Both the poll tick and write-triggered notifications go through the same
/// guard, held from the read until the message is queued on every client.
/// Whichever of the two runs second sees the snapshot the first announced, so
/// one change is broadcast once, and successive broadcasts reach each client
/// in call order. Queueing never waits on a client, so the guard is never held
/// across network I/O.
pub struct ChangeNotificationService {
    store: Arc<dyn RecordStore>,
    broadcaster: Broadcaster,
    retained: Mutex<Retained>,
    announce_initial: bool,
}

impl ChangeNotificationService {
    pub fn new(store: Arc<dyn RecordStore>, broadcaster: Broadcaster) -> Self {
        Self {
            store,
            broadcaster,
            retained: Mutex::new(Retained::Unset),
            announce_initial: true,
        }
    }

    /// Whether the first poll broadcasts a non-empty store (default `true`).
    ///
    /// An empty store on the first poll is recorded silently either way.
    pub fn announce_initial(mut self, announce: bool) -> Self {
        self.announce_initial = announce;
        self
    }

    /// The snapshot most recently announced or recorded, `None` before the first read
    pub async fn retained(&self) -> Option<Snapshot> {
        match &*self.retained.lock().await {
            Retained::Unset => None,
            Retained::Set(snapshot) => Some(snapshot.clone()),
        }
    }

    /// Read the records now, retain them and broadcast them.
    ///
    /// Called by write paths after a successful insert or update. If a poll
    /// tick slipped in between the write and this call and already announced
    /// the same records, nothing is broadcast again.
    pub async fn notify_now(&self) -> Result<Notified> {
        let mut retained = self.retained.lock().await;
        let snapshot = Snapshot::new(self.store.read_all().await?);

        if matches!(&*retained, Retained::Set(previous) if *previous == snapshot) {
            debug!(records = snapshot.len(), "Change already announced");
            return Ok(Notified {
                snapshot,
                report: None,
            });
        }

        *retained = Retained::Set(snapshot.clone());
        let report = self.broadcaster.broadcast(&snapshot.to_message());
        info!(
            records = snapshot.len(),
            delivered = report.delivered,
            pruned = report.pruned,
            "Change notified"
        );
        Ok(Notified {
            snapshot,
            report: Some(report),
        })
    }

    /// One poll: read, compare with the retained snapshot, broadcast on change.
    ///
    /// A failed read leaves the retained snapshot untouched.
    pub async fn tick(&self) -> Result<TickOutcome> {
        let mut retained = self.retained.lock().await;
        let snapshot = Snapshot::new(self.store.read_all().await?);

        let first = match &*retained {
            Retained::Set(previous) if *previous == snapshot => return Ok(TickOutcome::Unchanged),
            Retained::Set(_) => false,
            Retained::Unset => true,
        };

        if first && (snapshot.is_empty() || !self.announce_initial) {
            debug!(records = snapshot.len(), "Initial snapshot recorded");
            *retained = Retained::Set(snapshot);
            return Ok(TickOutcome::Initialized);
        }

        *retained = Retained::Set(snapshot.clone());
        let report = self.broadcaster.broadcast(&snapshot.to_message());
        info!(
            records = snapshot.len(),
            delivered = report.delivered,
            pruned = report.pruned,
            "Change detected by poll"
        );
        Ok(TickOutcome::Broadcast(report))
    }
}

impl std::fmt::Debug for ChangeNotificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotificationService")
            .field("broadcaster", &self.broadcaster)
            .field("announce_initial", &self.announce_initial)
            .finish_non_exhaustive()
    }
}
