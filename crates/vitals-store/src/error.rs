//! Error types for vitals-store.

use std::path::PathBuf;

use vitals_types::SampleIssue;

/// Result type for vitals-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in vitals-store.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Sample failed plausibility checks and was not admitted.
    #[error("Invalid sample: {0}")]
    InvalidSample(#[from] SampleIssue),

    /// Purge requested while samples are still waiting for delivery.
    #[error("Refusing to purge: {pending} sample(s) not yet sent")]
    UnsyncedEntries { pending: usize },

    /// Store capacity must be at least one slot.
    #[error("Invalid capacity {0}: must be at least 1")]
    InvalidCapacity(usize),

    /// Failed to create the journal directory.
    #[error("Failed to create journal directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
