//! Alert thresholds and evaluation.
//!
//! Temperature and heart rate are each classified independently against a
//! warning and a critical bound. A sample raises at most one alert; its
//! level is the highest triggered level and its reason lists every
//! triggered condition.
//!
//! # Example
//!
//! ```
//! use vitals_core::AlertEvaluator;
//! use vitals_types::{AlertLevel, Sample};
//!
//! let evaluator = AlertEvaluator::default();
//!
//! let alert = evaluator.evaluate(&Sample::new(38.5, 50.0, 90, 0)).unwrap();
//! assert_eq!(alert.level, AlertLevel::Critical);
//!
//! assert!(evaluator.evaluate(&Sample::new(36.0, 50.0, 90, 0)).is_none());
//! ```

use serde::{Deserialize, Serialize};

use vitals_types::{AlertEvent, AlertLevel, Sample};

use crate::error::{Error, Result};

/// Configurable alert bounds. A reading strictly above a bound triggers it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    /// Temperature warning bound in °C.
    pub temperature_warning: f32,
    /// Temperature critical bound in °C.
    pub temperature_critical: f32,
    /// Heart rate warning bound in bpm.
    pub heart_rate_warning: u16,
    /// Heart rate critical bound in bpm.
    pub heart_rate_critical: u16,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            temperature_warning: 37.5,
            temperature_critical: 38.0,
            heart_rate_warning: 100,
            heart_rate_critical: 120,
        }
    }
}

impl AlertThresholds {
    /// Reject bounds that cannot be evaluated consistently.
    pub fn validate(&self) -> Result<()> {
        if !self.temperature_warning.is_finite() || !self.temperature_critical.is_finite() {
            return Err(Error::InvalidConfig(
                "temperature thresholds must be finite".into(),
            ));
        }
        if self.temperature_warning > self.temperature_critical {
            return Err(Error::InvalidConfig(format!(
                "temperature warning ({}) is above critical ({})",
                self.temperature_warning, self.temperature_critical
            )));
        }
        if self.heart_rate_warning > self.heart_rate_critical {
            return Err(Error::InvalidConfig(format!(
                "heart rate warning ({}) is above critical ({})",
                self.heart_rate_warning, self.heart_rate_critical
            )));
        }
        Ok(())
    }

    pub fn classify_temperature(&self, celsius: f32) -> Option<AlertLevel> {
        if celsius > self.temperature_critical {
            Some(AlertLevel::Critical)
        } else if celsius > self.temperature_warning {
            Some(AlertLevel::Warning)
        } else {
            None
        }
    }

    pub fn classify_heart_rate(&self, bpm: u16) -> Option<AlertLevel> {
        if bpm > self.heart_rate_critical {
            Some(AlertLevel::Critical)
        } else if bpm > self.heart_rate_warning {
            Some(AlertLevel::Warning)
        } else {
            None
        }
    }
}

/// Evaluates samples against [`AlertThresholds`].
#[derive(Debug, Clone, Default)]
pub struct AlertEvaluator {
    thresholds: AlertThresholds,
}

impl AlertEvaluator {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    /// Classify one sample. Pure: no I/O, no state.
    pub fn evaluate(&self, sample: &Sample) -> Option<AlertEvent> {
        let mut level: Option<AlertLevel> = None;
        let mut reasons = Vec::with_capacity(2);

        if let Some(l) = self.thresholds.classify_temperature(sample.temperature) {
            let what = match l {
                AlertLevel::Critical => "high temperature",
                AlertLevel::Warning => "elevated temperature",
            };
            reasons.push(format!("{}: {} ({:.1}°C)", l, what, sample.temperature));
            level = level.max(Some(l));
        }

        if let Some(l) = self.thresholds.classify_heart_rate(sample.heart_rate) {
            let what = match l {
                AlertLevel::Critical => "high heart rate",
                AlertLevel::Warning => "elevated heart rate",
            };
            reasons.push(format!("{}: {} ({} bpm)", l, what, sample.heart_rate));
            level = level.max(Some(l));
        }

        level.map(|level| AlertEvent {
            level,
            reason: reasons.join("; "),
            sample_ts: sample.captured_at,
        })
    }
}
