//! # dbpulse-notify
//!
//! Change detection and notification for dbpulse.
//!
//! A [`ChangeNotificationService`] keeps the last [`Snapshot`] of the record
//! store that clients were told about. Writes call
//! [`notify_now`](ChangeNotificationService::notify_now); the
//! [`SnapshotPoller`] calls [`tick`](ChangeNotificationService::tick) on a
//! fixed period to catch edits made behind the service's back. Either way a
//! change becomes one `"DB Changed: [...]"` text message per client.

pub mod error;
pub mod poller;
pub mod service;
pub mod snapshot;

pub use error::{NotifyError, Result};
pub use poller::{PollerHandle, SnapshotPoller, DEFAULT_POLL_INTERVAL};
pub use service::{ChangeNotificationService, Notified, TickOutcome};
pub use snapshot::{Snapshot, CHANGE_PREFIX};
