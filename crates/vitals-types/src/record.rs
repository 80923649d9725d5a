//! Line-oriented journal record format.
//!
//! Each journal line is one self-contained JSON object:
//!
//! ```text
//! {"temp":36.6,"hum":48.5,"hr":72,"ts":15000,"sent":false}
//! ```
//!
//! The short field names keep records small on flash storage.

use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ParseResult};
use crate::types::{Millis, Sample};

/// Serialized form of a [`Sample`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Temperature in °C.
    pub temp: f32,
    /// Relative humidity in %.
    pub hum: f32,
    /// Heart rate in bpm. Signed so a corrupted negative value decodes
    /// and is then rejected instead of failing the whole line.
    pub hr: i64,
    /// Device uptime in milliseconds.
    pub ts: Millis,
    /// Delivery flag at the time the record was written.
    pub sent: bool,
}

impl From<&Sample> for SampleRecord {
    fn from(sample: &Sample) -> Self {
        Self {
            temp: sample.temperature,
            hum: sample.humidity,
            hr: i64::from(sample.heart_rate),
            ts: sample.captured_at,
            sent: sample.sent,
        }
    }
}

impl TryFrom<SampleRecord> for Sample {
    type Error = ParseError;

    /// Convert a decoded record into a validated sample.
    ///
    /// # Examples
    ///
    /// ```
    /// use vitals_types::{Sample, SampleRecord};
    ///
    /// let record = SampleRecord { temp: 36.6, hum: 50.0, hr: 72, ts: 10, sent: false };
    /// let sample = Sample::try_from(record).unwrap();
    /// assert_eq!(sample.heart_rate, 72);
    ///
    /// let broken = SampleRecord { hr: -4, ..record };
    /// assert!(Sample::try_from(broken).is_err());
    /// ```
    fn try_from(record: SampleRecord) -> ParseResult<Self> {
        let heart_rate = u16::try_from(record.hr).map_err(|_| {
            ParseError::InvalidData(format!("heart rate {} does not fit in u16", record.hr))
        })?;

        let sample = Sample {
            temperature: record.temp,
            humidity: record.hum,
            heart_rate,
            captured_at: record.ts,
            sent: record.sent,
        };
        sample.validate()?;
        Ok(sample)
    }
}
