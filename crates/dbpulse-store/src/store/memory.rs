use super::RecordStore;
use crate::error::{Result, StoreError};
use crate::record::Record;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Table {
    last_id: i64,
    rows: Vec<Record>,
}

/// In-memory record store (not persistent, for testing/dev)
///
/// Clones share the same table, so a test can keep one handle to play the
/// part of an external writer via [`MemoryStore::edit_value`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    table: Arc<Mutex<Table>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `(name, value)` rows, ids assigned from 1
    pub fn with_rows<'a>(rows: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        if let Ok(mut table) = store.table.lock() {
            for (name, value) in rows {
                table.last_id += 1;
                let id = table.last_id;
                table.rows.push(Record::new(id, name, value));
            }
        }
        store
    }

    /// Change a value without going through the notify path, as another
    /// process writing to the same database would
    pub fn edit_value(&self, id: i64, value: &str) -> Result<()> {
        let mut table = self.lock()?;
        let row = table
            .rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;
        row.value = Some(value.to_string());
        Ok(())
    }

    /// Make every operation fail with [`StoreError::Unavailable`] until reset
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Table>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store marked unavailable".to_string()));
        }
        self.table
            .lock()
            .map_err(|_| StoreError::Unavailable("Lock poisoned".to_string()))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn read_all(&self) -> Result<Vec<Record>> {
        // rows are appended with increasing ids, so insertion order is id order
        Ok(self.lock()?.rows.clone())
    }

    async fn insert(&self, name: &str, value: &str) -> Result<i64> {
        let mut table = self.lock()?;
        table.last_id += 1;
        let id = table.last_id;
        table.rows.push(Record::new(id, name, value));
        Ok(id)
    }

    async fn update(&self, id: i64, value: &str) -> Result<()> {
        self.edit_value(id, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_assigns_increasing_ids() {
        let store = MemoryStore::new();
        assert_eq!(store.insert("a", "1").await.unwrap(), 1);
        assert_eq!(store.insert("b", "2").await.unwrap(), 2);
        assert_eq!(
            store.read_all().await.unwrap(),
            vec![Record::new(1, "a", "1"), Record::new(2, "b", "2")]
        );
    }

    #[tokio::test]
    async fn update_missing_id_is_not_found() {
        let store = MemoryStore::with_rows([("a", "1")]);
        assert!(matches!(
            store.update(9, "x").await,
            Err(StoreError::NotFound(9))
        ));
        assert_eq!(store.read_all().await.unwrap(), vec![Record::new(1, "a", "1")]);
    }

    #[tokio::test]
    async fn edits_are_visible_through_clones() {
        let store = MemoryStore::with_rows([("a", "1")]);
        let outside = store.clone();
        outside.edit_value(1, "7").unwrap();
        assert_eq!(store.read_all().await.unwrap()[0].value.as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn unavailable_store_fails_reads() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.read_all().await,
            Err(StoreError::Unavailable(_))
        ));
        store.set_unavailable(false);
        assert!(store.read_all().await.unwrap().is_empty());
    }
}
