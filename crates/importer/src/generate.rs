//! Writes synthetic records as JSON lines
//!
//! The output can be fed back through the `import` command.

use anyhow::{Context, Result};
use serde_jsonlines::JsonLinesWriter;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::ConsumerConfig;
use crate::consumer;
use crate::source::EventSource;

/// Generate `config.col_count` records for the consumer frames into `output`
pub async fn run(config: &ConsumerConfig, output: &Path) -> Result<u64> {
    let source = EventSource::new(&consumer::frames(config)).with_limit(config.col_count);
    let output: PathBuf = output.to_path_buf();

    tokio::task::spawn_blocking(move || write_records(&source, &output))
        .await
        .context("generator task failed")?
}

fn write_records(source: &EventSource, output: &Path) -> Result<u64> {
    let file =
        File::create(output).with_context(|| format!("creating {}", output.display()))?;
    let mut writer = JsonLinesWriter::new(BufWriter::new(file));

    let mut written = 0;
    while let Some(record) = source.next_record() {
        writer
            .write(&record)
            .with_context(|| format!("writing {}", output.display()))?;
        written += 1;
    }
    writer.flush().context("flushing generated records")?;

    debug!(records = written, path = %output.display(), "Wrote generated records");
    Ok(written)
}
