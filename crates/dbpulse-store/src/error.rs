use thiserror::Error;

/// Errors surfaced by a [`RecordStore`](crate::RecordStore)
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be read or written; transient
    #[error("Record store unavailable: {0}")]
    Unavailable(String),

    /// An update targeted an id that does not exist
    #[error("Record not found: {0}")]
    NotFound(i64),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
