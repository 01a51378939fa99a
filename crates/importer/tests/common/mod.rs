//! Shared test doubles for pool integration tests

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use importer::error::{SinkError, SourceError};
use importer::sink::Sink;
use importer::source::Source;
use importer_common::types::Record;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Bit {
        frame: String,
        column: u64,
        row: u64,
    },
    Value {
        frame: String,
        field: String,
        column: u64,
        value: i64,
    },
    Close,
}

impl Call {
    pub fn bit(frame: &str, column: u64, row: u64) -> Self {
        Call::Bit {
            frame: frame.to_string(),
            column,
            row,
        }
    }

    pub fn value(frame: &str, field: &str, column: u64, value: i64) -> Self {
        Call::Value {
            frame: frame.to_string(),
            field: field.to_string(),
            column,
            value,
        }
    }

    pub fn column(&self) -> Option<u64> {
        match self {
            Call::Bit { column, .. } | Call::Value { column, .. } => Some(*column),
            Call::Close => None,
        }
    }
}

/// Records every call in arrival order
#[derive(Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<Call>>,
}

impl RecordingSink {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> usize {
        self.calls().iter().filter(|c| **c == Call::Close).count()
    }
}

#[async_trait]
impl Sink for RecordingSink {
    async fn add_bit(&self, frame: &str, column: u64, row: u64) -> Result<(), SinkError> {
        self.calls.lock().unwrap().push(Call::bit(frame, column, row));
        tokio::task::yield_now().await;
        Ok(())
    }

    async fn add_value(
        &self,
        frame: &str,
        field: &str,
        column: u64,
        value: i64,
    ) -> Result<(), SinkError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::value(frame, field, column, value));
        tokio::task::yield_now().await;
        Ok(())
    }

    async fn close(&self) -> Result<(), SinkError> {
        self.calls.lock().unwrap().push(Call::Close);
        Ok(())
    }
}

/// Hands out a fixed list of records, then end-of-stream forever
pub struct ScriptedSource {
    records: Mutex<VecDeque<Record>>,
    pub calls: AtomicU64,
}

impl ScriptedSource {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: Mutex::new(records.into()),
            calls: AtomicU64::new(0),
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Source for ScriptedSource {
    async fn record(&self) -> Result<Option<Record>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.lock().unwrap().pop_front())
    }
}

/// Never ends; each call yields a record built by `make` for the next column
pub struct EndlessSource<F> {
    make: F,
    pub calls: AtomicU64,
}

impl<F> EndlessSource<F>
where
    F: Fn(u64) -> Record + Send + Sync,
{
    pub fn new(make: F) -> Self {
        Self {
            make,
            calls: AtomicU64::new(0),
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<F> Source for EndlessSource<F>
where
    F: Fn(u64) -> Record + Send + Sync,
{
    async fn record(&self) -> Result<Option<Record>, SourceError> {
        let column = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(Some((self.make)(column)))
    }
}
