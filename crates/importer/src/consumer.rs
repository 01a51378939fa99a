//! Synthetic consumer run
//!
//! Declares `f0..fN` bit frames and `v0..vM` value frames, generates one
//! random record per column and imports them into a fresh memory index.

use anyhow::Result;
use importer_common::types::FrameSpec;
use indicatif::ProgressBar;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::ConsumerConfig;
use crate::runner::{RunOutcome, Session};
use crate::source::EventSource;

/// Frames declared for a consumer run, without import options
pub fn frames(config: &ConsumerConfig) -> Vec<FrameSpec> {
    let bits = (0..config.frame_count).map(|i| FrameSpec::ranked(format!("f{}", i)));
    let values =
        (0..config.val_count).map(|i| FrameSpec::field(format!("v{}", i), 0, i64::from(u32::MAX)));
    bits.chain(values).collect()
}

/// Number of writes a complete run applies
pub fn expected_writes(config: &ConsumerConfig) -> u64 {
    config.col_count * (config.frame_count + config.val_count) as u64
}

pub async fn run(
    config: &ConsumerConfig,
    progress: ProgressBar,
    cancel: CancellationToken,
) -> Result<RunOutcome> {
    config.validate()?;

    let mut session = Session::new(config.pool.clone());
    for frame in frames(config) {
        session.declare(frame);
    }

    let source = Arc::new(EventSource::new(session.frames()));
    session.run(source, config.col_count, progress, cancel).await
}
