//! Importer Common Library
//!
//! Shared types, logging, and error handling for the importer workspace.
//!
//! # Overview
//!
//! - **Types**: records, frame declarations and import progress updates
//! - **Error Handling**: [`ImporterError`] and the [`Result`] alias
//! - **Logging**: `tracing` subscriber setup driven by [`logging::LogConfig`]
//!
//! # Example
//!
//! ```no_run
//! use importer_common::types::{FrameSpec, Record};
//!
//! let frame = FrameSpec::ranked("f0");
//! frame.validate()?;
//!
//! let record = Record::new(0).with_row("f0", 5);
//! assert_eq!(record.write_count(), 1);
//! # Ok::<(), importer_common::ImporterError>(())
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{ImporterError, Result};
