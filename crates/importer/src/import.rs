//! Import of line-delimited JSON records

use anyhow::{Context, Result};
use importer_common::types::FrameSpec;
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

use crate::config::PoolConfig;
use crate::runner::{RunOutcome, Session};
use crate::source::{JsonLinesSource, Source};

/// Input path meaning standard input
pub const STDIN: &str = "-";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    pub pool: PoolConfig,
    /// JSON lines file, or `-` for stdin
    pub input: PathBuf,
    /// Frames receiving bits
    pub bit_frames: Vec<String>,
    /// Frames receiving values on a field named after the frame
    pub value_frames: Vec<String>,
    pub value_min: i64,
    pub value_max: i64,
    /// Records to import; 0 reads until end of input
    pub limit: u64,
}

impl ImportConfig {
    pub fn frames(&self) -> Vec<FrameSpec> {
        let bits = self.bit_frames.iter().map(FrameSpec::ranked);
        let values = self
            .value_frames
            .iter()
            .map(|name| FrameSpec::field(name, self.value_min, self.value_max));
        bits.chain(values).collect()
    }

    fn reads_stdin(&self) -> bool {
        self.input.as_os_str() == STDIN
    }
}

pub async fn run(
    config: &ImportConfig,
    progress: ProgressBar,
    cancel: CancellationToken,
) -> Result<RunOutcome> {
    let mut session = Session::new(config.pool.clone());
    for frame in config.frames() {
        session.declare(frame);
    }

    let source: Arc<dyn Source> = if config.reads_stdin() {
        Arc::new(JsonLinesSource::new(BufReader::new(tokio::io::stdin())))
    } else {
        let file = JsonLinesSource::open(&config.input)
            .await
            .with_context(|| format!("opening {}", config.input.display()))?;
        Arc::new(file)
    };

    session.run(source, config.limit, progress, cancel).await
}
