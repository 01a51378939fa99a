//! Frame (category) declarations

use crate::error::{ImporterError, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::status::ImportStatusUpdate;

/// Default number of buffered writes per frame before a flush
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// A range-encoded integer field inside a frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub min: i64,
    pub max: i64,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, min: i64, max: i64) -> Self {
        Self {
            name: name.into(),
            min,
            max,
        }
    }

    pub fn contains(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Per-frame import behaviour handed to the sink
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOptions {
    /// Writes buffered before the sink flushes the frame
    pub batch_size: usize,

    /// Channel receiving progress updates for this frame.
    /// The sink drops its sender once the frame is fully flushed.
    #[serde(skip)]
    pub status: Option<mpsc::Sender<ImportStatusUpdate>>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            status: None,
        }
    }
}

/// A named partition of the index space
///
/// Frames without fields receive bits; frames with fields receive values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSpec {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub options: ImportOptions,
}

impl FrameSpec {
    /// A bit frame with no fields
    pub fn ranked(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            options: ImportOptions::default(),
        }
    }

    /// A value frame with a single field named after the frame
    pub fn field(name: impl Into<String>, min: i64, max: i64) -> Self {
        let name = name.into();
        Self {
            fields: vec![FieldSpec::new(name.clone(), min, max)],
            name,
            options: ImportOptions::default(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.options.batch_size = batch_size;
        self
    }

    pub fn with_status_channel(mut self, tx: mpsc::Sender<ImportStatusUpdate>) -> Self {
        self.options.status = Some(tx);
        self
    }

    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    pub fn field_spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check the declaration before a sink accepts it
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ImporterError::InvalidFrame("frame name is empty".to_string()));
        }
        if self.options.batch_size == 0 {
            return Err(ImporterError::InvalidFrame(format!(
                "frame '{}' has a batch size of 0",
                self.name
            )));
        }
        for field in &self.fields {
            if field.min > field.max {
                return Err(ImporterError::InvalidFrame(format!(
                    "field '{}' in frame '{}' has min {} > max {}",
                    field.name, self.name, field.min, field.max
                )));
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for FrameSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.fields.is_empty() {
            write!(f, "{}", self.name)
        } else {
            let fields: Vec<_> = self.fields.iter().map(|fs| fs.name.as_str()).collect();
            write!(f, "{}[{}]", self.name, fields.join(","))
        }
    }
}
