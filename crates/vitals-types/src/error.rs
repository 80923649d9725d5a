//! Error types for decoding persisted records.

use thiserror::Error;

use crate::validation::SampleIssue;

/// Errors that can occur when turning a persisted record back into a sample.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// A field holds a value that does not fit the sample model.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The record decoded but describes an implausible reading.
    #[error("Invalid sample: {0}")]
    InvalidSample(#[from] SampleIssue),
}

/// Result type alias using vitals-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
