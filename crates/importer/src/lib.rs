//! Importer Library
//!
//! Ingests records into a bitmap index with a pool of concurrent workers and
//! reports import progress as one merged stream.
//!
//! # Components
//!
//! - [`pool::IngestionPool`]: workers pulling from a [`source::Source`] and
//!   writing to a [`sink::Sink`] until a fixed budget or end-of-stream
//! - [`status::StatusAggregator`]: fan-in of per-frame progress channels
//! - [`source::EventSource`] and [`source::JsonLinesSource`]: record sources
//! - [`sink::MemoryIndexer`]: batching in-memory index
//!
//! # Example
//!
//! ```no_run
//! use importer::pool::IngestionPool;
//! use importer::sink::MemoryIndexer;
//! use importer::source::EventSource;
//! use importer_common::types::FrameSpec;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let frames = vec![FrameSpec::ranked("f0"), FrameSpec::field("v0", 0, 1000)];
//!     let source = Arc::new(EventSource::new(&frames));
//!     let sink = Arc::new(MemoryIndexer::setup("iot", frames)?);
//!
//!     let summary = IngestionPool::new(source, sink, 1000)
//!         .with_concurrency(4)
//!         .run()
//!         .await?;
//!     println!("imported {} records", summary.records);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod consumer;
pub mod error;
pub mod generate;
pub mod import;
pub mod pool;
pub mod progress;
pub mod runner;
pub mod sink;
pub mod source;
pub mod stats;
pub mod status;

// Re-export commonly used types
pub use error::{IngestError, SinkError, SourceError};
pub use pool::{IngestSummary, IngestionPool};
pub use status::StatusAggregator;
