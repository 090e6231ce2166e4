//! Error types for trackgeek crates.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using GeekError.
pub type GeekResult<T> = Result<T, GeekError>;

/// Primary error type for track aggregation, rendering and storage.
#[derive(Debug, Error)]
pub enum GeekError {
    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Configuration(String),

    // === Per-track Errors ===
    #[error("Track error for '{}': {message}", path.display())]
    Track { path: PathBuf, message: String },

    // === Track Store Errors ===
    #[error("Track '{}' is not inside the vault at '{}'", path.display(), vault.display())]
    VaultMismatch { path: PathBuf, vault: PathBuf },

    #[error("Track not found in library: {0}")]
    NotFound(String),

    #[error("Track already stored in library: {0}")]
    DuplicateTrack(String),

    #[error("Database error: {0}")]
    Database(String),

    // === Rendering Errors ===
    #[error("Rendering failed: {0}")]
    Render(String),

    // === Infrastructure Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GeekError {
    /// Build a per-track error.
    pub fn track(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        GeekError::Track {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Build a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        GeekError::Configuration(message.into())
    }

    /// Whether this error only concerns a single track.
    ///
    /// Per-track errors are recorded and skipped; everything else aborts a batch.
    pub fn is_per_track(&self) -> bool {
        matches!(self, GeekError::Track { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_track_classification() {
        assert!(GeekError::track("/tmp/a.gpx", "no timestamps").is_per_track());
        assert!(!GeekError::config("bad palette").is_per_track());
        assert!(!GeekError::NotFound("abc".into()).is_per_track());
    }

    #[test]
    fn test_track_error_message_names_path() {
        let err = GeekError::track("/data/ride.gpx", "no timestamps");
        let msg = err.to_string();
        assert!(msg.contains("/data/ride.gpx"));
        assert!(msg.contains("no timestamps"));
    }
}
