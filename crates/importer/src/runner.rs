//! Wiring of one import run
//!
//! A [`Session`] owns the frame declarations and their status channels. Running
//! it sets up the index, starts the status observer, and drives the pool.

use anyhow::{Context, Result};
use futures::{Stream, StreamExt};
use importer_common::types::{FrameSpec, ImportStatus};
use indicatif::ProgressBar;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::PoolConfig;
use crate::pool::{IngestSummary, IngestionPool};
use crate::sink::MemoryIndexer;
use crate::source::Source;
use crate::stats::TermStat;
use crate::status::{status_channel, StatusAggregator, StatusChannel};

/// Result of a finished run
pub struct RunOutcome {
    pub summary: IngestSummary,
    /// Progress updates seen on the merged status stream
    pub status_updates: u64,
    pub indexer: Arc<MemoryIndexer>,
}

/// Frames and status channels for one run
pub struct Session {
    config: PoolConfig,
    frames: Vec<FrameSpec>,
    channels: Vec<StatusChannel>,
}

impl Session {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            frames: Vec::new(),
            channels: Vec::new(),
        }
    }

    /// Declare a frame; it gets the session batch size and a status channel
    pub fn declare(&mut self, frame: FrameSpec) {
        let (tx, channel) = status_channel(frame.name.clone(), self.config.status_buffer);
        self.channels.push(channel);
        self.frames.push(
            frame
                .with_batch_size(self.config.batch_size)
                .with_status_channel(tx),
        );
    }

    pub fn frames(&self) -> &[FrameSpec] {
        &self.frames
    }

    /// Import everything `source` yields, up to `budget` records (0 = until EOF)
    pub async fn run(
        self,
        source: Arc<dyn Source>,
        budget: u64,
        progress: ProgressBar,
        cancel: CancellationToken,
    ) -> Result<RunOutcome> {
        self.config.validate()?;
        let Session {
            config,
            frames,
            channels,
        } = self;

        let names: Vec<String> = frames.iter().map(ToString::to_string).collect();
        info!(index = %config.index, frames = ?names, "Declared frames");

        let indexer = Arc::new(
            MemoryIndexer::setup(config.index.clone(), frames).context("setting up sink")?,
        );

        let statuses = StatusAggregator::new(channels).into_stream();
        let observer = tokio::spawn(observe(statuses, progress.clone()));

        let stats = Arc::new(TermStat::new());
        let stop_stats = CancellationToken::new();
        let _stop_on_exit = stop_stats.clone().drop_guard();
        let reporter = stats
            .clone()
            .spawn_reporter(config.stats_interval(), stop_stats.clone());

        let summary = IngestionPool::new(source, indexer.clone(), budget)
            .with_concurrency(config.concurrency)
            .with_stats(stats)
            .with_cancellation(cancel)
            .run()
            .await
            .context("running ingester")?;

        stop_stats.cancel();
        reporter.await.context("stats reporter failed")?;
        let status_updates = observer.await.context("status observer failed")?;
        progress.finish_with_message("Import finished");

        Ok(RunOutcome {
            summary,
            status_updates,
            indexer,
        })
    }
}

/// Log every merged status update and advance `progress` by newly imported writes
async fn observe<S>(mut statuses: S, progress: ProgressBar) -> u64
where
    S: Stream<Item = ImportStatus> + Unpin,
{
    let mut imported: HashMap<String, u64> = HashMap::new();
    let mut seen = 0;

    while let Some(status) = statuses.next().await {
        info!(
            frame = %status.frame,
            thread = status.update.thread_id,
            slice = status.update.slice,
            count = status.update.imported_count,
            time = ?status.update.time,
            "STATUS"
        );
        let previous = imported
            .insert(status.frame, status.update.imported_count)
            .unwrap_or(0);
        progress.inc(status.update.imported_count.saturating_sub(previous));
        seen += 1;
    }

    seen
}
