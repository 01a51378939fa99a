//! Index sinks
//!
//! A [`Sink`] receives the individual writes a record decomposes into. It is
//! shared by all workers and must handle concurrent calls itself.

use async_trait::async_trait;

use crate::error::SinkError;

mod memory;

pub use memory::{IndexSnapshot, MemoryIndexer};

#[async_trait]
pub trait Sink: Send + Sync {
    /// Set the bit `(frame, row)` for `column`
    async fn add_bit(&self, frame: &str, column: u64, row: u64) -> Result<(), SinkError>;

    /// Record `value` for `field` of `frame` at `column`
    async fn add_value(
        &self,
        frame: &str,
        field: &str,
        column: u64,
        value: i64,
    ) -> Result<(), SinkError>;

    /// Flush everything and release the sink
    ///
    /// Progress channels handed to the sink are closed once their frame has
    /// been flushed.
    async fn close(&self) -> Result<(), SinkError>;
}
