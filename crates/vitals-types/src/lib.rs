//! Shared types for the wearable vitals telemetry node.
//!
//! This crate holds the data model that every other crate in the workspace
//! agrees on:
//!
//! - [`Sample`], one timestamped temperature/humidity/heart-rate reading
//! - [`SampleRecord`], the line-oriented JSON form stored in the journal
//! - [`AlertEvent`] and [`AlertLevel`] produced by threshold evaluation
//! - plausibility checks ([`SampleIssue`]) applied before admission
//!
//! # Example
//!
//! ```
//! use vitals_types::{Sample, SampleRecord};
//!
//! let sample = Sample::new(36.8, 51.0, 74, 12_000);
//! let record = SampleRecord::from(&sample);
//! assert_eq!(record.hr, 74);
//! ```

pub mod error;
pub mod record;
pub mod types;
pub mod validation;

pub use error::{ParseError, ParseResult};
pub use record::SampleRecord;
pub use types::{AlertEvent, AlertLevel, Millis, Sample};
pub use validation::SampleIssue;
