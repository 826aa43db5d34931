use crate::error::Result;
use crate::record::Record;
use async_trait::async_trait;

pub mod memory;
pub mod sqlite;

/// Persistent collection of [`Record`]s
///
/// Any implementation may also be modified by parties outside this process;
/// readers must not assume they observe every write that happens.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Every record, ordered by id
    async fn read_all(&self) -> Result<Vec<Record>>;

    /// Insert a record and return its newly assigned id
    async fn insert(&self, name: &str, value: &str) -> Result<i64>;

    /// Replace the value of record `id`.
    /// Fails with [`StoreError::NotFound`](crate::StoreError::NotFound) if no such record exists.
    async fn update(&self, id: i64, value: &str) -> Result<()>;
}
