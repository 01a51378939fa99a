//! Ingestion worker pool
//!
//! Workers pull records from a shared [`Source`], split each record into bit
//! and value writes, and apply them to a shared [`Sink`]. The pool waits for
//! every worker to stop and then closes the sink exactly once.
//!
//! Failure model: a worker that hits a source or sink error logs it and
//! stops, forfeiting the rest of its budget share. Sibling workers keep
//! going. Only the final `close` error fails the run; worker failures are
//! reported through [`IngestSummary::failed_workers`].

use importer_common::types::Record;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{IngestError, SinkError};
use crate::sink::Sink;
use crate::source::Source;
use crate::stats::{self, Statter, TermStat};

/// Why a worker stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    BudgetExhausted,
    EndOfStream,
    Cancelled,
    Failed,
}

/// What a single worker did before stopping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker: usize,
    pub records: u64,
    pub bits: u64,
    pub values: u64,
    pub exit: WorkerExit,
}

/// Totals across all workers of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub workers: usize,
    pub records: u64,
    pub bits: u64,
    pub values: u64,
    pub failed_workers: usize,
    pub cancelled_workers: usize,
}

impl IngestSummary {
    fn absorb(&mut self, report: &WorkerReport) {
        self.records += report.records;
        self.bits += report.bits;
        self.values += report.values;
        match report.exit {
            WorkerExit::Failed => self.failed_workers += 1,
            WorkerExit::Cancelled => self.cancelled_workers += 1,
            WorkerExit::BudgetExhausted | WorkerExit::EndOfStream => {},
        }
    }
}

/// Split `budget` across `workers` so the shares sum to exactly `budget`
///
/// A budget of 0 means unbounded: every worker runs until end-of-stream.
pub fn split_budget(budget: u64, workers: usize) -> Vec<Option<u64>> {
    let workers = workers.max(1);
    if budget == 0 {
        return vec![None; workers];
    }
    let n = workers as u64;
    let (base, extra) = (budget / n, budget % n);
    (0..n).map(|i| Some(base + u64::from(i < extra))).collect()
}

/// Runs a fixed number of workers over a source and a sink
pub struct IngestionPool {
    parse_concurrency: usize,
    budget: u64,
    source: Arc<dyn Source>,
    sink: Arc<dyn Sink>,
    stats: Arc<dyn Statter>,
    cancel: CancellationToken,
}

impl IngestionPool {
    /// A single-worker pool that attempts `budget` records (0 = until EOF)
    pub fn new(source: Arc<dyn Source>, sink: Arc<dyn Sink>, budget: u64) -> Self {
        Self {
            parse_concurrency: 1,
            budget,
            source,
            sink,
            stats: Arc::new(TermStat::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Number of concurrent workers; 0 is treated as 1
    pub fn with_concurrency(mut self, parse_concurrency: usize) -> Self {
        self.parse_concurrency = parse_concurrency.max(1);
        self
    }

    pub fn with_stats(mut self, stats: Arc<dyn Statter>) -> Self {
        self.stats = stats;
        self
    }

    /// Stop workers early when `cancel` fires; the sink is still closed
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.parse_concurrency
    }

    /// Run every worker to completion, then close the sink
    pub async fn run(self) -> Result<IngestSummary, IngestError> {
        let shares = split_budget(self.budget, self.parse_concurrency);

        info!(
            workers = shares.len(),
            budget = self.budget,
            "Spawning ingest workers"
        );

        let mut handles = Vec::with_capacity(shares.len());
        for (id, share) in shares.into_iter().enumerate() {
            let worker = Worker {
                id,
                share,
                source: self.source.clone(),
                sink: self.sink.clone(),
                stats: self.stats.clone(),
                cancel: self.cancel.clone(),
            };
            handles.push(tokio::spawn(worker.run()));
        }

        let mut summary = IngestSummary {
            workers: handles.len(),
            ..Default::default()
        };

        for (idx, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(report) => {
                    debug!(
                        worker = idx,
                        records = report.records,
                        exit = ?report.exit,
                        "Worker completed"
                    );
                    summary.absorb(&report);
                },
                Err(e) => {
                    error!(worker = idx, error = %e, "Worker panicked");
                    summary.failed_workers += 1;
                },
            }
        }

        if summary.failed_workers > 0 {
            warn!(
                failed = summary.failed_workers,
                records = summary.records,
                "Some workers stopped early"
            );
        }
        info!(
            records = summary.records,
            bits = summary.bits,
            values = summary.values,
            "All workers completed, closing sink"
        );

        self.sink.close().await.map_err(IngestError::Close)?;
        Ok(summary)
    }
}

struct Worker {
    id: usize,
    share: Option<u64>,
    source: Arc<dyn Source>,
    sink: Arc<dyn Sink>,
    stats: Arc<dyn Statter>,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(self) -> WorkerReport {
        let mut report = WorkerReport {
            worker: self.id,
            records: 0,
            bits: 0,
            values: 0,
            exit: WorkerExit::BudgetExhausted,
        };

        loop {
            if self.share.is_some_and(|share| report.records >= share) {
                report.exit = WorkerExit::BudgetExhausted;
                break;
            }

            let fetched = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!(worker = self.id, "Worker cancelled");
                    report.exit = WorkerExit::Cancelled;
                    break;
                }
                fetched = self.source.record() => fetched,
            };

            let record = match fetched {
                Ok(Some(record)) => record,
                Ok(None) => {
                    debug!(worker = self.id, records = report.records, "End of stream");
                    report.exit = WorkerExit::EndOfStream;
                    break;
                },
                Err(e) => {
                    error!(worker = self.id, error = %e, "error in ingest run loop");
                    report.exit = WorkerExit::Failed;
                    break;
                },
            };
            self.stats.count(stats::RECORD, 1, 1.0);

            if let Err(e) = self.apply(&record, &mut report).await {
                error!(
                    worker = self.id,
                    column = record.column(),
                    error = %e,
                    "Failed to apply record"
                );
                report.exit = WorkerExit::Failed;
                break;
            }
            report.records += 1;
        }

        report
    }

    /// Apply every write of `record` in order: rows first, then values
    async fn apply(&self, record: &Record, report: &mut WorkerReport) -> Result<(), SinkError> {
        let column = record.column();

        for row in record.rows() {
            self.sink.add_bit(&row.frame, column, row.id).await?;
            self.stats.count(stats::ADD_BIT, 1, 1.0);
            report.bits += 1;
        }
        for val in record.values() {
            self.sink
                .add_value(&val.frame, &val.field, column, val.value)
                .await?;
            self.stats.count(stats::ADD_VALUE, 1, 1.0);
            report.values += 1;
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    proptest! {
        #[test]
        fn prop_budget_shares_sum_to_budget(budget in 1u64..100_000, workers in 1usize..64) {
            let shares = split_budget(budget, workers);
            prop_assert_eq!(shares.len(), workers);
            let total: u64 = shares.iter().map(|s| s.unwrap()).sum();
            prop_assert_eq!(total, budget);

            let max = shares.iter().map(|s| s.unwrap()).max().unwrap();
            let min = shares.iter().map(|s| s.unwrap()).min().unwrap();
            prop_assert!(max - min <= 1);
        }
    }

    #[test]
    fn test_zero_budget_is_unbounded() {
        assert_eq!(split_budget(0, 3), vec![None, None, None]);
        assert_eq!(split_budget(5, 0), vec![Some(5)]);
    }

    /// Fails on the n-th call, succeeds with an empty record otherwise
    struct FlakySource {
        calls: AtomicU64,
        fail_on: u64,
    }

    #[async_trait]
    impl Source for FlakySource {
        async fn record(&self) -> Result<Option<Record>, SourceError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == self.fail_on {
                return Err(SourceError::other("broken pipe"));
            }
            Ok(Some(Record::new(call).with_row("f0", 1)))
        }
    }

    #[derive(Default)]
    struct CountingSink {
        bits: AtomicU64,
        closes: AtomicUsize,
    }

    #[async_trait]
    impl Sink for CountingSink {
        async fn add_bit(&self, _frame: &str, _column: u64, _row: u64) -> Result<(), SinkError> {
            self.bits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn add_value(
            &self,
            frame: &str,
            _field: &str,
            _column: u64,
            _value: i64,
        ) -> Result<(), SinkError> {
            Err(SinkError::UnknownFrame(frame.to_string()))
        }

        async fn close(&self) -> Result<(), SinkError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_source_error_stops_only_that_worker() {
        let source = Arc::new(FlakySource {
            calls: AtomicU64::new(0),
            fail_on: 0,
        });
        let sink = Arc::new(CountingSink::default());

        let summary = IngestionPool::new(source.clone(), sink.clone(), 10)
            .with_concurrency(2)
            .with_stats(Arc::new(stats::NopStatter))
            .run()
            .await
            .unwrap();

        // one worker fails on the first call and loses its share of 5
        assert_eq!(summary.failed_workers, 1);
        assert_eq!(summary.records, 5);
        assert_eq!(sink.bits.load(Ordering::SeqCst), 5);
        assert_eq!(sink.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sink_write_error_stops_worker() {
        struct ValueSource;

        #[async_trait]
        impl Source for ValueSource {
            async fn record(&self) -> Result<Option<Record>, SourceError> {
                Ok(Some(Record::new(0).with_row("f0", 1).with_value("v0", "v0", 3)))
            }
        }

        let sink = Arc::new(CountingSink::default());
        let summary = IngestionPool::new(Arc::new(ValueSource), sink.clone(), 4)
            .run()
            .await
            .unwrap();

        assert_eq!(summary.failed_workers, 1);
        assert_eq!(summary.records, 0);
        assert_eq!(summary.bits, 1);
        assert_eq!(sink.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_counts_reach_statter() {
        let source = Arc::new(FlakySource {
            calls: AtomicU64::new(0),
            fail_on: u64::MAX,
        });
        let stats = Arc::new(TermStat::new());

        IngestionPool::new(source, Arc::new(CountingSink::default()), 3)
            .with_stats(stats.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(stats.get(stats::RECORD), 3);
        assert_eq!(stats.get(stats::ADD_BIT), 3);
        assert_eq!(stats.get(stats::ADD_VALUE), 0);
    }

    #[tokio::test]
    async fn test_cancelled_pool_still_closes_sink() {
        let source = Arc::new(FlakySource {
            calls: AtomicU64::new(0),
            fail_on: u64::MAX,
        });
        let sink = Arc::new(CountingSink::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = IngestionPool::new(source.clone(), sink.clone(), 0)
            .with_concurrency(3)
            .with_cancellation(cancel)
            .run()
            .await
            .unwrap();

        assert_eq!(summary.cancelled_workers, 3);
        assert_eq!(summary.records, 0);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(sink.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_close_error_is_returned() {
        struct FailingClose;

        #[async_trait]
        impl Sink for FailingClose {
            async fn add_bit(&self, _: &str, _: u64, _: u64) -> Result<(), SinkError> {
                Ok(())
            }
            async fn add_value(&self, _: &str, _: &str, _: u64, _: i64) -> Result<(), SinkError> {
                Ok(())
            }
            async fn close(&self) -> Result<(), SinkError> {
                Err(SinkError::Closed)
            }
        }

        let source = Arc::new(FlakySource {
            calls: AtomicU64::new(0),
            fail_on: 0,
        });
        let result = IngestionPool::new(source, Arc::new(FailingClose), 1).run().await;
        assert!(matches!(result, Err(IngestError::Close(SinkError::Closed))));
    }
}
