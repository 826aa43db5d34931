//! # dbpulse-store
//!
//! The record store watched by dbpulse.
//!
//! [`RecordStore`] is the seam between the service and its database. Two
//! backends are provided:
//!
//! - [`SqliteStore`]: the `items` table of a SQLite database, created on connect
//! - [`MemoryStore`]: a shared in-process table for tests and development
//!
//! ```rust,ignore
//! let store = SqliteStore::connect("sqlite://test.db?mode=rwc").await?;
//! let id = store.insert("a", "1").await?;
//! store.update(id, "2").await?;
//! let rows = store.read_all().await?;
//! ```

pub mod error;
pub mod record;
pub mod store;

pub use error::{Result, StoreError};
pub use record::Record;
pub use store::memory::MemoryStore;
pub use store::sqlite::SqliteStore;
pub use store::RecordStore;
