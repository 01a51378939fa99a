//! Error types shared across the importer crates

use thiserror::Error;

/// Result type alias for common importer operations
pub type Result<T> = std::result::Result<T, ImporterError>;

/// Main error type for shared importer functionality
#[derive(Error, Debug)]
pub enum ImporterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ImporterError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
