//! Synthetic event generator

use async_trait::async_trait;
use importer_common::types::{FrameSpec, Record};
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

use super::Source;
use crate::error::SourceError;

/// Rows are drawn from `0..ROW_SPREAD` for bit frames
const ROW_SPREAD: u64 = 100;

/// Values span at most this many integers starting at the field minimum
const VALUE_SPREAD: i64 = 1_000_000;

#[derive(Debug, Clone)]
enum Target {
    Bits,
    Value { field: String, min: i64, max: i64 },
}

/// Generates one random record per column, in increasing column order
///
/// Every bit frame gets one random row and every value frame gets one random
/// value on its first field. Without a limit the stream never ends.
#[derive(Debug)]
pub struct EventSource {
    targets: Vec<(String, Target)>,
    next_column: AtomicU64,
    limit: Option<u64>,
}

impl EventSource {
    /// Build a generator for `frames`
    ///
    /// Only names and field ranges are kept, so the frames' status channels
    /// are not held open by the source.
    pub fn new(frames: &[FrameSpec]) -> Self {
        let targets = frames
            .iter()
            .map(|frame| {
                let target = match frame.fields.first() {
                    None => Target::Bits,
                    Some(field) => Target::Value {
                        field: field.name.clone(),
                        min: field.min,
                        max: field
                            .max
                            .min(field.min.saturating_add(VALUE_SPREAD - 1))
                            .max(field.min),
                    },
                };
                (frame.name.clone(), target)
            })
            .collect();

        Self {
            targets,
            next_column: AtomicU64::new(0),
            limit: None,
        }
    }

    /// Signal end-of-stream after `limit` records
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Number of columns handed out so far
    pub fn generated(&self) -> u64 {
        let next = self.next_column.load(Ordering::Relaxed);
        self.limit.map_or(next, |limit| next.min(limit))
    }

    /// Synchronous form of [`Source::record`]; `None` once the limit is reached
    pub fn next_record(&self) -> Option<Record> {
        let column = self.next_column.fetch_add(1, Ordering::Relaxed);
        if self.limit.is_some_and(|limit| column >= limit) {
            return None;
        }
        Some(self.generate(column))
    }

    fn generate(&self, column: u64) -> Record {
        let mut rng = rand::rng();
        let mut record = Record::new(column);
        for (frame, target) in &self.targets {
            match target {
                Target::Bits => record.add_row(frame.as_str(), rng.random_range(0..ROW_SPREAD)),
                Target::Value { field, min, max } => {
                    record.add_value(frame.as_str(), field.as_str(), rng.random_range(*min..=*max))
                },
            }
        }
        record
    }
}

#[async_trait]
impl Source for EventSource {
    async fn record(&self) -> Result<Option<Record>, SourceError> {
        Ok(self.next_record())
    }
}
