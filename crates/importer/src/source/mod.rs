//! Record sources
//!
//! Implement [`Source`] for anything that can hand out records, e.g. a
//! generator, a file, or a message queue consumer.

use async_trait::async_trait;
use importer_common::types::Record;

use crate::error::SourceError;

mod event;
mod jsonl;

pub use event::EventSource;
pub use jsonl::JsonLinesSource;

/// Producer of records shared by every worker of a pool
#[async_trait]
pub trait Source: Send + Sync {
    /// Fetch the next record
    ///
    /// `Ok(None)` signals end-of-stream. Once returned, every later call must
    /// return `Ok(None)` again.
    async fn record(&self) -> Result<Option<Record>, SourceError>;
}
