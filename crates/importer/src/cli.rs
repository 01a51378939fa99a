//! Command-line interface
//!
//! Flags override `IMPORTER_*` environment variables, which override the
//! built-in defaults.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{ConsumerConfig, PoolConfig};
use crate::import::ImportConfig;

#[derive(Parser, Debug)]
#[command(name = "importer")]
#[command(author, version, about = "Ingest records into a bitmap index", long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Hide the progress bar
    #[arg(long, global = true)]
    pub no_progress: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate random events and import them into a fresh index
    Consumer(ConsumerArgs),

    /// Import records from a JSON lines file
    Import(ImportArgs),

    /// Write random events as JSON lines
    Generate(GenerateArgs),
}

/// Options shared by commands that run an ingestion pool
#[derive(Args, Debug, Default)]
pub struct PoolArgs {
    /// Index name
    #[arg(long)]
    pub index: Option<String>,

    /// Batch size for imports (latency/throughput tradeoff)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Number of concurrent ingest workers
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Capacity of each per-frame status channel
    #[arg(long)]
    pub status_buffer: Option<usize>,
}

impl PoolArgs {
    pub fn apply(&self, config: &mut PoolConfig) {
        if let Some(ref index) = self.index {
            config.index = index.clone();
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(status_buffer) = self.status_buffer {
            config.status_buffer = status_buffer;
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct FrameArgs {
    /// Number of frames to write single bits to
    #[arg(long)]
    pub frame_count: Option<usize>,

    /// Number of frames to write values to
    #[arg(long)]
    pub val_count: Option<usize>,

    /// Number of columns to create
    #[arg(long)]
    pub col_count: Option<u64>,
}

impl FrameArgs {
    pub fn apply(&self, config: &mut ConsumerConfig) {
        if let Some(frame_count) = self.frame_count {
            config.frame_count = frame_count;
        }
        if let Some(val_count) = self.val_count {
            config.val_count = val_count;
        }
        if let Some(col_count) = self.col_count {
            config.col_count = col_count;
        }
    }
}

#[derive(Args, Debug)]
pub struct ConsumerArgs {
    #[command(flatten)]
    pub pool: PoolArgs,

    #[command(flatten)]
    pub frames: FrameArgs,
}

impl ConsumerArgs {
    /// Layer these flags over `base`
    pub fn merge(&self, mut base: ConsumerConfig) -> ConsumerConfig {
        self.pool.apply(&mut base.pool);
        self.frames.apply(&mut base);
        base
    }
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// JSON lines file with one record per line, `-` for stdin
    pub input: PathBuf,

    #[command(flatten)]
    pub pool: PoolArgs,

    /// Bit frame to declare (repeatable)
    #[arg(long = "frame")]
    pub frames: Vec<String>,

    /// Value frame to declare, with a field of the same name (repeatable)
    #[arg(long = "value-frame")]
    pub value_frames: Vec<String>,

    /// Smallest accepted value for value frames
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub value_min: i64,

    /// Largest accepted value for value frames
    #[arg(long, default_value_t = i64::from(u32::MAX), allow_hyphen_values = true)]
    pub value_max: i64,

    /// Stop after this many records (0 = read to end of input)
    #[arg(long, default_value_t = 0)]
    pub limit: u64,
}

impl ImportArgs {
    pub fn into_config(self, mut pool: PoolConfig) -> ImportConfig {
        self.pool.apply(&mut pool);
        ImportConfig {
            pool,
            input: self.input,
            bit_frames: self.frames,
            value_frames: self.value_frames,
            value_min: self.value_min,
            value_max: self.value_max,
            limit: self.limit,
        }
    }
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Output file
    #[arg(short, long)]
    pub output: PathBuf,

    #[command(flatten)]
    pub frames: FrameArgs,
}
