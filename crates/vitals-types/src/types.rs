//! Core types for vitals telemetry.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Device uptime in milliseconds.
///
/// Timestamps are monotonic since boot, not wall-clock time. They restart
/// from zero after a reboot, so ordering across boots is carried by
/// insertion order rather than by timestamp.
pub type Millis = u64;

/// One reading captured by the wearable.
///
/// A sample is immutable once created except for the `sent` flag, which
/// only flips to `true` once the sync engine has confirmed delivery.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Skin/ambient temperature in degrees Celsius.
    pub temperature: f32,
    /// Relative humidity in percent.
    pub humidity: f32,
    /// Heart rate in beats per minute.
    pub heart_rate: u16,
    /// Device uptime at acquisition.
    pub captured_at: Millis,
    /// Whether delivery to the broker has been confirmed.
    pub sent: bool,
}

impl Sample {
    /// Create a new, unsent sample.
    ///
    /// # Examples
    ///
    /// ```
    /// use vitals_types::Sample;
    ///
    /// let sample = Sample::new(36.6, 48.0, 72, 5_000);
    /// assert!(!sample.sent);
    /// assert_eq!(sample.heart_rate, 72);
    /// ```
    #[must_use]
    pub fn new(temperature: f32, humidity: f32, heart_rate: u16, captured_at: Millis) -> Self {
        Self {
            temperature,
            humidity,
            heart_rate,
            captured_at,
            sent: false,
        }
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.1}°C {:.1}% {} bpm @{}ms",
            self.temperature, self.humidity, self.heart_rate, self.captured_at
        )
    }
}

/// Severity of an alert.
///
/// Ordered by severity so the overall level of a multi-condition alert is
/// simply the maximum: `Warning < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    /// Reading is elevated and worth watching.
    Warning,
    /// Reading needs immediate attention.
    Critical,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertLevel::Warning => write!(f, "WARNING"),
            AlertLevel::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// An alert derived from a single sample.
///
/// Alerts are ephemeral: they are published best-effort and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    /// Highest severity among the triggered conditions.
    pub level: AlertLevel,
    /// Human-readable description of every triggered condition.
    pub reason: String,
    /// `captured_at` of the sample that raised the alert.
    pub sample_ts: Millis,
}
