//! Plausibility checks applied before a sample is admitted.
//!
//! A sensor that fails to read (the DHT family reports NaN) or a corrupted
//! journal line must never reach the offline store.

use thiserror::Error;

use crate::types::Sample;

/// Lowest heart rate accepted as a real reading.
pub const MIN_HEART_RATE: u16 = 20;
/// Highest heart rate accepted as a real reading.
pub const MAX_HEART_RATE: u16 = 250;
/// Plausible temperature range for a body-worn sensor, in °C.
pub const TEMPERATURE_RANGE: (f32, f32) = (-40.0, 80.0);

/// Why a sample was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[non_exhaustive]
pub enum SampleIssue {
    /// Temperature is NaN or infinite.
    #[error("temperature is not a number")]
    TemperatureNotFinite,
    /// Temperature outside [`TEMPERATURE_RANGE`].
    #[error(
        "temperature {value}°C is outside {}..{}°C",
        TEMPERATURE_RANGE.0,
        TEMPERATURE_RANGE.1
    )]
    TemperatureOutOfRange { value: f32 },
    /// Humidity is NaN or infinite.
    #[error("humidity is not a number")]
    HumidityNotFinite,
    /// Humidity outside 0-100 %.
    #[error("humidity {value}% is outside 0..100%")]
    HumidityOutOfRange { value: f32 },
    /// Heart rate outside [`MIN_HEART_RATE`]..=[`MAX_HEART_RATE`].
    #[error("heart rate {value} bpm is outside {}..{} bpm", MIN_HEART_RATE, MAX_HEART_RATE)]
    HeartRateOutOfRange { value: u16 },
}

impl Sample {
    /// Check that every field holds a plausible value.
    ///
    /// # Examples
    ///
    /// ```
    /// use vitals_types::{Sample, SampleIssue};
    ///
    /// assert!(Sample::new(36.6, 45.0, 70, 0).validate().is_ok());
    /// assert_eq!(
    ///     Sample::new(f32::NAN, 45.0, 70, 0).validate(),
    ///     Err(SampleIssue::TemperatureNotFinite)
    /// );
    /// ```
    pub fn validate(&self) -> Result<(), SampleIssue> {
        if !self.temperature.is_finite() {
            return Err(SampleIssue::TemperatureNotFinite);
        }
        if self.temperature < TEMPERATURE_RANGE.0 || self.temperature > TEMPERATURE_RANGE.1 {
            return Err(SampleIssue::TemperatureOutOfRange {
                value: self.temperature,
            });
        }
        if !self.humidity.is_finite() {
            return Err(SampleIssue::HumidityNotFinite);
        }
        if !(0.0..=100.0).contains(&self.humidity) {
            return Err(SampleIssue::HumidityOutOfRange {
                value: self.humidity,
            });
        }
        if !(MIN_HEART_RATE..=MAX_HEART_RATE).contains(&self.heart_rate) {
            return Err(SampleIssue::HeartRateOutOfRange {
                value: self.heart_rate,
            });
        }
        Ok(())
    }

    /// Convenience wrapper around [`Sample::validate`].
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typical_sample_is_valid() {
        assert!(Sample::new(36.4, 52.0, 72, 1_000).is_valid());
    }

    #[test]
    fn test_nan_humidity_rejected() {
        let sample = Sample::new(36.4, f32::NAN, 72, 1_000);
        assert_eq!(sample.validate(), Err(SampleIssue::HumidityNotFinite));
    }

    #[test]
    fn test_infinite_temperature_rejected() {
        let sample = Sample::new(f32::INFINITY, 50.0, 72, 1_000);
        assert_eq!(sample.validate(), Err(SampleIssue::TemperatureNotFinite));
    }

    #[test]
    fn test_humidity_boundaries() {
        assert!(Sample::new(36.0, 0.0, 72, 0).is_valid());
        assert!(Sample::new(36.0, 100.0, 72, 0).is_valid());
        assert!(!Sample::new(36.0, 100.5, 72, 0).is_valid());
        assert!(!Sample::new(36.0, -0.1, 72, 0).is_valid());
    }

    #[test]
    fn test_zero_heart_rate_rejected() {
        let sample = Sample::new(36.0, 50.0, 0, 0);
        assert_eq!(
            sample.validate(),
            Err(SampleIssue::HeartRateOutOfRange { value: 0 })
        );
    }

    #[test]
    fn test_issue_display() {
        let issue = SampleIssue::HeartRateOutOfRange { value: 300 };
        assert!(issue.to_string().contains("300 bpm"));
        assert!(SampleIssue::HumidityNotFinite.to_string().contains("humidity"));
        assert_eq!(
            SampleIssue::TemperatureOutOfRange { value: 90.0 }.to_string(),
            "temperature 90°C is outside -40..80°C"
        );
        assert_eq!(
            SampleIssue::HeartRateOutOfRange { value: 300 }.to_string(),
            "heart rate 300 bpm is outside 20..250 bpm"
        );
    }
}
