//! Error types for GPX reading.

use thiserror::Error;

/// Result type for GPX reader operations.
pub type GpxResult<T> = Result<T, GpxError>;

#[derive(Debug, Error)]
pub enum GpxError {
    /// File I/O error
    #[error("Failed to read track: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or non-GPX document
    #[error("Invalid GPX document: {0}")]
    Parse(String),

    /// Point timestamp that cannot be represented as UTC
    #[error("Invalid timestamp: {0}")]
    InvalidTime(String),
}
