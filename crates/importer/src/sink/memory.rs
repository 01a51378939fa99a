//! In-memory batching index
//!
//! Stands in for a remote bitmap index. Every frame gets its own importer
//! task that buffers writes, flushes them in batches grouped by slice, and
//! reports progress on the frame's status channel.

use async_trait::async_trait;
use importer_common::types::{slice_of, FieldSpec, FrameSpec, ImportStatusUpdate};
use importer_common::ImporterError;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

use super::Sink;
use crate::error::SinkError;

#[derive(Debug)]
enum Write {
    Bit { column: u64, row: u64 },
    Value { field: String, column: u64, value: i64 },
}

impl Write {
    fn column(&self) -> u64 {
        match self {
            Write::Bit { column, .. } | Write::Value { column, .. } => *column,
        }
    }
}

/// Contents of a [`MemoryIndexer`] at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSnapshot {
    /// frame -> row -> columns with the bit set
    pub bits: BTreeMap<String, BTreeMap<u64, BTreeSet<u64>>>,
    /// frame -> field -> column -> value
    pub values: BTreeMap<String, BTreeMap<String, BTreeMap<u64, i64>>>,
}

impl IndexSnapshot {
    pub fn contains_bit(&self, frame: &str, row: u64, column: u64) -> bool {
        self.bits
            .get(frame)
            .and_then(|rows| rows.get(&row))
            .is_some_and(|columns| columns.contains(&column))
    }

    pub fn value(&self, frame: &str, field: &str, column: u64) -> Option<i64> {
        self.values
            .get(frame)
            .and_then(|fields| fields.get(field))
            .and_then(|columns| columns.get(&column))
            .copied()
    }

    pub fn bit_count(&self) -> usize {
        self.bits
            .values()
            .flat_map(|rows| rows.values())
            .map(BTreeSet::len)
            .sum()
    }

    pub fn value_count(&self) -> usize {
        self.values
            .values()
            .flat_map(|fields| fields.values())
            .map(BTreeMap::len)
            .sum()
    }

    fn apply(&mut self, frame: &str, writes: Vec<Write>) {
        for write in writes {
            match write {
                Write::Bit { column, row } => {
                    self.bits
                        .entry(frame.to_string())
                        .or_default()
                        .entry(row)
                        .or_default()
                        .insert(column);
                },
                Write::Value {
                    field,
                    column,
                    value,
                } => {
                    self.values
                        .entry(frame.to_string())
                        .or_default()
                        .entry(field)
                        .or_default()
                        .insert(column, value);
                },
            }
        }
    }
}

struct FrameWriter {
    fields: Vec<FieldSpec>,
    tx: mpsc::Sender<Write>,
}

/// Batching in-memory [`Sink`]
pub struct MemoryIndexer {
    index: String,
    writers: RwLock<Option<HashMap<String, FrameWriter>>>,
    importers: Mutex<Vec<(String, JoinHandle<u64>)>>,
    store: Arc<RwLock<IndexSnapshot>>,
}

impl MemoryIndexer {
    /// Validate `frames` and start one importer task per frame
    ///
    /// Must be called from within a tokio runtime. The frames are consumed so
    /// that the indexer ends up owning every status sender.
    pub fn setup(index: impl Into<String>, frames: Vec<FrameSpec>) -> Result<Self, SinkError> {
        let index = index.into();

        let mut seen = HashSet::new();
        for frame in &frames {
            frame.validate()?;
            if !seen.insert(frame.name.as_str()) {
                return Err(ImporterError::InvalidFrame(format!(
                    "frame '{}' is declared more than once",
                    frame.name
                ))
                .into());
            }
        }

        let store = Arc::new(RwLock::new(IndexSnapshot::default()));
        let mut writers = HashMap::with_capacity(frames.len());
        let mut importers = Vec::with_capacity(frames.len());

        for (thread_id, frame) in frames.into_iter().enumerate() {
            let FrameSpec {
                name,
                fields,
                options,
            } = frame;
            let (tx, rx) = mpsc::channel(options.batch_size);

            let importer = Importer {
                frame: name.clone(),
                thread_id: thread_id as u64,
                batch_size: options.batch_size,
                status: options.status,
                store: store.clone(),
                started: Instant::now(),
                imported: 0,
                buffer: Vec::with_capacity(options.batch_size),
            };
            importers.push((name.clone(), tokio::spawn(importer.run(rx))));
            writers.insert(name, FrameWriter { fields, tx });
        }

        info!(index = %index, frames = importers.len(), "Memory index ready");

        Ok(Self {
            index,
            writers: RwLock::new(Some(writers)),
            importers: Mutex::new(importers),
            store,
        })
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    /// Copy of everything imported so far
    pub async fn snapshot(&self) -> IndexSnapshot {
        self.store.read().await.clone()
    }

    async fn route<F>(&self, frame: &str, build: F) -> Result<(), SinkError>
    where
        F: FnOnce(&FrameWriter) -> Result<Write, SinkError>,
    {
        let (tx, write) = {
            let guard = self.writers.read().await;
            let writers = guard.as_ref().ok_or(SinkError::Closed)?;
            let writer = writers
                .get(frame)
                .ok_or_else(|| SinkError::UnknownFrame(frame.to_string()))?;
            (writer.tx.clone(), build(writer)?)
        };

        tx.send(write).await.map_err(|_| SinkError::Importer {
            frame: frame.to_string(),
            message: "importer stopped accepting writes".to_string(),
        })
    }
}

#[async_trait]
impl Sink for MemoryIndexer {
    async fn add_bit(&self, frame: &str, column: u64, row: u64) -> Result<(), SinkError> {
        self.route(frame, |_| Ok(Write::Bit { column, row })).await
    }

    async fn add_value(
        &self,
        frame: &str,
        field: &str,
        column: u64,
        value: i64,
    ) -> Result<(), SinkError> {
        self.route(frame, |writer| {
            let spec = writer
                .fields
                .iter()
                .find(|f| f.name == field)
                .ok_or_else(|| SinkError::UnknownField {
                    frame: frame.to_string(),
                    field: field.to_string(),
                })?;
            if !spec.contains(value) {
                return Err(SinkError::OutOfRange {
                    frame: frame.to_string(),
                    field: field.to_string(),
                    value,
                    min: spec.min,
                    max: spec.max,
                });
            }
            Ok(Write::Value {
                field: field.to_string(),
                column,
                value,
            })
        })
        .await
    }

    async fn close(&self) -> Result<(), SinkError> {
        let Some(writers) = self.writers.write().await.take() else {
            return Err(SinkError::Closed);
        };
        drop(writers);

        let importers = std::mem::take(&mut *self.importers.lock().await);
        let mut first_error = None;
        let mut imported = 0;

        for (frame, handle) in importers {
            match handle.await {
                Ok(count) => {
                    debug!(frame = %frame, imported = count, "Frame flushed");
                    imported += count;
                },
                Err(e) => {
                    error!(frame = %frame, error = %e, "Importer task failed");
                    first_error.get_or_insert(SinkError::Importer {
                        frame,
                        message: e.to_string(),
                    });
                },
            }
        }

        info!(index = %self.index, imported = imported, "Memory index closed");
        first_error.map_or(Ok(()), Err)
    }
}

struct Importer {
    frame: String,
    thread_id: u64,
    batch_size: usize,
    status: Option<mpsc::Sender<ImportStatusUpdate>>,
    store: Arc<RwLock<IndexSnapshot>>,
    started: Instant,
    imported: u64,
    buffer: Vec<Write>,
}

impl Importer {
    /// Drain writes until every sender is gone, then flush the remainder.
    /// Dropping `self` afterwards closes the status channel.
    async fn run(mut self, mut rx: mpsc::Receiver<Write>) -> u64 {
        while let Some(write) = rx.recv().await {
            self.buffer.push(write);
            if self.buffer.len() >= self.batch_size {
                self.flush().await;
            }
        }
        self.flush().await;
        self.imported
    }

    async fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        let mut by_slice: BTreeMap<u64, Vec<Write>> = BTreeMap::new();
        for write in self.buffer.drain(..) {
            by_slice.entry(slice_of(write.column())).or_default().push(write);
        }

        for (slice, writes) in by_slice {
            let count = writes.len() as u64;
            self.store.write().await.apply(&self.frame, writes);
            self.imported += count;
            trace!(frame = %self.frame, slice = slice, count = count, "Imported batch");

            let update = ImportStatusUpdate {
                thread_id: self.thread_id,
                slice,
                imported_count: self.imported,
                time: self.started.elapsed(),
            };
            let delivered = match &self.status {
                Some(tx) => tx.send(update).await.is_ok(),
                None => true,
            };
            if !delivered {
                debug!(frame = %self.frame, "Status receiver dropped, no further updates");
                self.status = None;
            }
        }
    }
}
