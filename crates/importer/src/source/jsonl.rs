//! Line-delimited JSON record source

use async_trait::async_trait;
use importer_common::types::Record;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::Mutex;
use tracing::debug;

use super::Source;
use crate::error::SourceError;

struct LineReader<R> {
    lines: Lines<R>,
    line_no: u64,
    exhausted: bool,
}

/// Reads one JSON-encoded [`Record`] per line
///
/// Workers take turns on the underlying reader. Blank lines are skipped.
pub struct JsonLinesSource<R> {
    reader: Mutex<LineReader<R>>,
}

impl<R> JsonLinesSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader: Mutex::new(LineReader {
                lines: reader.lines(),
                line_no: 0,
                exhausted: false,
            }),
        }
    }
}

impl JsonLinesSource<BufReader<File>> {
    /// Open a file of JSON lines
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let file = File::open(path.as_ref()).await?;
        Ok(Self::new(BufReader::new(file)))
    }
}

#[async_trait]
impl<R> Source for JsonLinesSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn record(&self) -> Result<Option<Record>, SourceError> {
        let mut reader = self.reader.lock().await;
        if reader.exhausted {
            return Ok(None);
        }

        loop {
            let Some(line) = reader.lines.next_line().await? else {
                debug!(lines = reader.line_no, "Reached end of record stream");
                reader.exhausted = true;
                return Ok(None);
            };
            reader.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }

            return serde_json::from_str(&line)
                .map(Some)
                .map_err(|source| SourceError::Decode {
                    line: reader.line_no,
                    source,
                });
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_reads_records_and_skips_blank_lines() {
        let input: &[u8] = b"{\"col\":1,\"rows\":[{\"frame\":\"f0\",\"id\":3}]}\n\n   \n{\"col\":2}\n";
        let source = JsonLinesSource::new(input);

        let first = source.record().await.unwrap().unwrap();
        assert_eq!(first.column(), 1);
        assert_eq!(first.rows()[0].id, 3);

        let second = source.record().await.unwrap().unwrap();
        assert_eq!(second.column(), 2);
        assert!(second.is_empty());

        assert!(source.record().await.unwrap().is_none());
        assert!(source.record().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_decode_error_reports_line() {
        let input: &[u8] = b"{\"col\":1}\n{\"col\":\"x\"}\n";
        let source = JsonLinesSource::new(input);

        assert!(source.record().await.unwrap().is_some());
        match source.record().await {
            Err(SourceError::Decode { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_open_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{\"col\":7,\"vals\":[{{\"frame\":\"v0\",\"field\":\"v0\",\"value\":12}}]}}").unwrap();

        let source = JsonLinesSource::open(file.path()).await.unwrap();
        let record = source.record().await.unwrap().unwrap();
        assert_eq!(record.column(), 7);
        assert_eq!(record.values()[0].value, 12);
        assert!(source.record().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = JsonLinesSource::open("/definitely/not/here.jsonl").await;
        assert!(matches!(result, Err(SourceError::Io(_))));
    }
}
