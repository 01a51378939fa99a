//! Run configuration
//!
//! Values are layered: built-in defaults, then `IMPORTER_*` environment
//! variables, then command-line flags.

use importer_common::types::DEFAULT_BATCH_SIZE;
use importer_common::{ImporterError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::status::DEFAULT_STATUS_BUFFER;

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_INDEX: &str = "iot";
pub const DEFAULT_COLUMN_COUNT: u64 = 1000;
pub const DEFAULT_STATS_INTERVAL_SECS: u64 = 10;

/// Settings shared by every command that runs an ingestion pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Name of the target index
    pub index: String,
    /// Writes buffered per frame before the sink flushes
    pub batch_size: usize,
    /// Number of concurrent ingest workers
    pub concurrency: usize,
    /// Capacity of each per-frame status channel
    pub status_buffer: usize,
    /// Seconds between stats log lines
    pub stats_interval_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            index: DEFAULT_INDEX.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: 1,
            status_buffer: DEFAULT_STATUS_BUFFER,
            stats_interval_secs: DEFAULT_STATS_INTERVAL_SECS,
        }
    }
}

impl PoolConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            index: std::env::var("IMPORTER_INDEX").unwrap_or(defaults.index),
            batch_size: env_or("IMPORTER_BATCH_SIZE", defaults.batch_size)?,
            concurrency: env_or("IMPORTER_CONCURRENCY", defaults.concurrency)?,
            status_buffer: env_or("IMPORTER_STATUS_BUFFER", defaults.status_buffer)?,
            stats_interval_secs: env_or("IMPORTER_STATS_INTERVAL_SECS", defaults.stats_interval_secs)?,
        })
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs.max(1))
    }

    pub fn validate(&self) -> Result<()> {
        if self.index.trim().is_empty() {
            return Err(ImporterError::config("index name must not be empty"));
        }
        if self.batch_size == 0 {
            return Err(ImporterError::config("batch size must be at least 1"));
        }
        if self.concurrency == 0 {
            return Err(ImporterError::config("concurrency must be at least 1"));
        }
        Ok(())
    }
}

/// Options for the synthetic consumer run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerConfig {
    #[serde(flatten)]
    pub pool: PoolConfig,
    /// Number of frames receiving single bits (`f0`, `f1`, ...)
    pub frame_count: usize,
    /// Number of frames receiving values (`v0`, `v1`, ...)
    pub val_count: usize,
    /// Number of columns (records) to create
    pub col_count: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            frame_count: 1,
            val_count: 1,
            col_count: DEFAULT_COLUMN_COUNT,
        }
    }
}

impl ConsumerConfig {
    /// Defaults overridden by `IMPORTER_*` environment variables
    ///
    /// Recognised variables: `IMPORTER_INDEX`, `IMPORTER_BATCH_SIZE`,
    /// `IMPORTER_CONCURRENCY`, `IMPORTER_STATUS_BUFFER`,
    /// `IMPORTER_STATS_INTERVAL_SECS`, `IMPORTER_FRAME_COUNT`,
    /// `IMPORTER_VAL_COUNT`, `IMPORTER_COL_COUNT`.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            pool: PoolConfig::from_env()?,
            frame_count: env_or("IMPORTER_FRAME_COUNT", defaults.frame_count)?,
            val_count: env_or("IMPORTER_VAL_COUNT", defaults.val_count)?,
            col_count: env_or("IMPORTER_COL_COUNT", defaults.col_count)?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.pool.validate()?;
        if self.col_count == 0 {
            return Err(ImporterError::config(
                "column count must be at least 1, the generator never ends on its own",
            ));
        }
        Ok(())
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ImporterError::config(format!("invalid {}='{}': {}", key, raw, e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConsumerConfig::default();
        assert_eq!(config.pool.index, "iot");
        assert_eq!(config.pool.batch_size, 1000);
        assert_eq!(config.pool.concurrency, 1);
        assert_eq!(config.frame_count, 1);
        assert_eq!(config.val_count, 1);
        assert_eq!(config.col_count, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        let mut config = ConsumerConfig::default();
        config.pool.concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = ConsumerConfig::default();
        config.col_count = 0;
        assert!(config.validate().is_err());

        let mut config = ConsumerConfig::default();
        config.pool.index = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_or_parses_and_rejects() {
        std::env::set_var("IMPORTER_TEST_ENV_OR_OK", " 12 ");
        std::env::set_var("IMPORTER_TEST_ENV_OR_BAD", "twelve");

        assert_eq!(env_or("IMPORTER_TEST_ENV_OR_OK", 1usize).unwrap(), 12);
        assert!(env_or("IMPORTER_TEST_ENV_OR_BAD", 1usize).is_err());
        assert_eq!(env_or("IMPORTER_TEST_ENV_OR_MISSING", 3u64).unwrap(), 3);

        std::env::remove_var("IMPORTER_TEST_ENV_OR_OK");
        std::env::remove_var("IMPORTER_TEST_ENV_OR_BAD");
    }
}
