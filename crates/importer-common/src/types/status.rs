//! Import progress updates

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Number of columns covered by one slice (data shard) of the index
pub const SLICE_WIDTH: u64 = 1 << 20;

/// Progress reported by a sink after importing a batch into one slice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStatusUpdate {
    /// Importer that performed the write
    pub thread_id: u64,
    /// Slice the batch landed in
    pub slice: u64,
    /// Cumulative number of writes imported by this importer
    pub imported_count: u64,
    /// Time since the importer started
    pub time: Duration,
}

/// An update tagged with the frame whose stream produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStatus {
    pub frame: String,
    #[serde(flatten)]
    pub update: ImportStatusUpdate,
}

impl std::fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "frame: {}, thread: {}, slice: {}, count: {}, time: {:?}",
            self.frame,
            self.update.thread_id,
            self.update.slice,
            self.update.imported_count,
            self.update.time
        )
    }
}

/// Slice that `column` belongs to
pub fn slice_of(column: u64) -> u64 {
    column / SLICE_WIDTH
}
