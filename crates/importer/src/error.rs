//! Error types for the ingestion core
//!
//! Only [`IngestError`] ever escapes [`crate::pool::IngestionPool::run`].
//! Source and sink write errors stop the worker that hit them and are logged.

use importer_common::ImporterError;
use thiserror::Error;

/// Errors raised by a [`crate::source::Source`] other than end-of-stream
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to read records: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode record on line {line}: {source}")]
    Decode {
        line: u64,
        #[source]
        source: serde_json::Error,
    },

    #[error("Source error: {0}")]
    Other(String),
}

impl SourceError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Errors raised by a [`crate::sink::Sink`]
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Invalid sink setup: {0}")]
    Setup(#[from] ImporterError),

    #[error("Frame '{0}' is not declared")]
    UnknownFrame(String),

    #[error("Field '{field}' is not declared in frame '{frame}'")]
    UnknownField { frame: String, field: String },

    #[error("Value {value} for field '{field}' in frame '{frame}' is outside [{min}, {max}]")]
    OutOfRange {
        frame: String,
        field: String,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("Importer for frame '{frame}' failed: {message}")]
    Importer { frame: String, message: String },

    #[error("Sink is closed")]
    Closed,
}

/// Error returned by a pool run
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to close sink: {0}")]
    Close(#[source] SinkError),
}
