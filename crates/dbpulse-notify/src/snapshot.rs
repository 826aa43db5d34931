//! Point-in-time copies of the record set and their rendering

use dbpulse_store::Record;
use dbpulse_ws::Message;
use std::fmt;
use std::sync::Arc;

/// Prefix of every change notification sent to clients
pub const CHANGE_PREFIX: &str = "DB Changed: ";

/// An ordered, immutable copy of every record at one instant
///
/// Equality is element-wise over the full sequence, order included. Clones
/// share the underlying rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    records: Arc<[Record]>,
}

impl Snapshot {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: records.into(),
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The notification clients receive for this snapshot
    pub fn to_message(&self) -> Message {
        Message::text(format!("{}{}", CHANGE_PREFIX, self))
    }
}

impl From<Vec<Record>> for Snapshot {
    fn from(records: Vec<Record>) -> Self {
        Self::new(records)
    }
}

/// Renders as a bracketed list of row tuples: `[(1, 'a', '1'), (2, 'b', '2')]`
impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, record) in self.records.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", record)?;
        }
        f.write_str("]")
    }
}
