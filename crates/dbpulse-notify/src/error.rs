use dbpulse_store::StoreError;
use thiserror::Error;

/// Errors from a notification attempt
///
/// Delivery problems never show up here: the broadcaster absorbs them by
/// pruning connections. Only the snapshot read can fail.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Reading the current records failed; nothing was broadcast
    #[error("Snapshot read failed: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, NotifyError>;
