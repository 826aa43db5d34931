//! The record type owned by the store

use serde::ser::{Serialize, SerializeTuple, Serializer};
use std::fmt::{self, Write};

/// One row of the `items` table
#[derive(Debug, Clone, PartialEq, Eq, Hash, sqlx::FromRow)]
pub struct Record {
    /// Unique, monotonically assigned id
    pub id: i64,
    /// Record name; `None` for a NULL written by another tool
    pub name: Option<String>,
    /// Record value; `None` for a NULL written by another tool
    pub value: Option<String>,
}

impl Record {
    /// Create a record with both columns set
    pub fn new(id: i64, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
            value: Some(value.into()),
        }
    }
}

/// Serialized as an `[id, name, value]` triple, the row shape clients consume.
impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(3)?;
        tuple.serialize_element(&self.id)?;
        tuple.serialize_element(&self.name)?;
        tuple.serialize_element(&self.value)?;
        tuple.end()
    }
}

/// Renders as a row tuple, e.g. `(1, 'a', '1')` or `(2, None, 'x')`.
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, ", self.id)?;
        write_column(f, self.name.as_deref())?;
        f.write_str(", ")?;
        write_column(f, self.value.as_deref())?;
        f.write_str(")")
    }
}

fn write_column(f: &mut fmt::Formatter<'_>, column: Option<&str>) -> fmt::Result {
    match column {
        Some(text) => write_quoted(f, text),
        None => f.write_str("None"),
    }
}

/// Quote a string the way row tuples have always been rendered to clients:
/// single quotes, switching to double quotes when the text holds a single
/// quote but no double quote.
fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };

    f.write_char(quote)?;
    for ch in s.chars() {
        match ch {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c == quote => {
                f.write_str("\\")?;
                f.write_char(c)?;
            }
            c => f.write_char(c)?,
        }
    }
    f.write_char(quote)
}
