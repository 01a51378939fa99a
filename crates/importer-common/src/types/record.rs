//! Record data model
//!
//! A [`Record`] is one logical entity to index: a column identifier plus the
//! bits and values that should be recorded against it.

use serde::{Deserialize, Serialize};

/// A membership bit `(frame, row)` to set for the record's column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowAssignment {
    pub frame: String,
    pub id: u64,
}

/// A scalar value to record against a range-encoded field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueAssignment {
    pub frame: String,
    pub field: String,
    pub value: i64,
}

/// One unit of work produced by a source and consumed by exactly one worker
///
/// The column is fixed when the record is created. Rows and values keep
/// insertion order, which is the order writes are applied in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "col")]
    column: u64,
    #[serde(default)]
    rows: Vec<RowAssignment>,
    #[serde(default, rename = "vals")]
    values: Vec<ValueAssignment>,
}

impl Record {
    /// Create an empty record for `column`
    pub fn new(column: u64) -> Self {
        Self {
            column,
            rows: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn column(&self) -> u64 {
        self.column
    }

    pub fn rows(&self) -> &[RowAssignment] {
        &self.rows
    }

    pub fn values(&self) -> &[ValueAssignment] {
        &self.values
    }

    /// Append a bit assignment
    pub fn add_row(&mut self, frame: impl Into<String>, id: u64) {
        self.rows.push(RowAssignment {
            frame: frame.into(),
            id,
        });
    }

    /// Append a value assignment
    pub fn add_value(&mut self, frame: impl Into<String>, field: impl Into<String>, value: i64) {
        self.values.push(ValueAssignment {
            frame: frame.into(),
            field: field.into(),
            value,
        });
    }

    /// Builder-style variant of [`Record::add_row`]
    pub fn with_row(mut self, frame: impl Into<String>, id: u64) -> Self {
        self.add_row(frame, id);
        self
    }

    /// Builder-style variant of [`Record::add_value`]
    pub fn with_value(
        mut self,
        frame: impl Into<String>,
        field: impl Into<String>,
        value: i64,
    ) -> Self {
        self.add_value(frame, field, value);
        self
    }

    /// Total number of writes this record decomposes into
    pub fn write_count(&self) -> usize {
        self.rows.len() + self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.write_count() == 0
    }
}
