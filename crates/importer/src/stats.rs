//! Counter statistics
//!
//! Workers report every fetched record and every applied write through a
//! [`Statter`]. Reporting is fire-and-forget and never fails a worker.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub const RECORD: &str = "ingest.Record";
pub const ADD_BIT: &str = "ingest.AddBit";
pub const ADD_VALUE: &str = "ingest.AddValue";

/// Sink for named counters
pub trait Statter: Send + Sync {
    /// Add `delta` to `name`, sampled at `rate` (1.0 = every event)
    fn count(&self, name: &str, delta: i64, rate: f64);
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NopStatter;

impl Statter for NopStatter {
    fn count(&self, _name: &str, _delta: i64, _rate: f64) {}
}

/// Keeps counters in memory and periodically logs their totals
#[derive(Debug, Default)]
pub struct TermStat {
    counters: Mutex<BTreeMap<String, i64>>,
}

impl TermStat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current totals; empty if a reporter panicked while holding the lock
    pub fn snapshot(&self) -> BTreeMap<String, i64> {
        self.counters
            .lock()
            .map(|counters| counters.clone())
            .unwrap_or_default()
    }

    pub fn get(&self, name: &str) -> i64 {
        self.snapshot().get(name).copied().unwrap_or(0)
    }

    /// Log the totals every `every` until `cancel` fires, then once more
    pub fn spawn_reporter(
        self: Arc<Self>,
        every: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => self.report(),
                }
            }
            self.report();
        })
    }

    fn report(&self) {
        for (name, total) in self.snapshot() {
            info!(metric = %name, total = total, "stats");
        }
    }
}

impl Statter for TermStat {
    fn count(&self, name: &str, delta: i64, rate: f64) {
        let delta = if rate >= 1.0 {
            delta
        } else if rate > 0.0 && rand::random::<f64>() < rate {
            (delta as f64 / rate).round() as i64
        } else {
            return;
        };

        if let Ok(mut counters) = self.counters.lock() {
            *counters.entry(name.to_string()).or_insert(0) += delta;
        }
    }
}
