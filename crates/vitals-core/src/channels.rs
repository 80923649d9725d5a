//! Topic naming and payload encoding for the broker channels.
//!
//! Every sample is published on four channels: three scalar topics carrying
//! plain decimal text and one aggregate topic carrying a JSON document.
//! Alerts and node status each get a topic of their own.

use serde::Serialize;

use vitals_types::{AlertEvent, Millis, Sample};

use crate::error::Result;

/// Topic prefix used when none is configured.
pub const DEFAULT_TOPIC_PREFIX: &str = "telemetry";

/// A logical broker channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Temperature,
    Humidity,
    HeartRate,
    AllData,
    Alert,
    Status,
}

impl Channel {
    /// Channels carrying one sample, in publish order.
    pub const TELEMETRY: [Channel; 4] = [
        Channel::Temperature,
        Channel::Humidity,
        Channel::HeartRate,
        Channel::AllData,
    ];

    /// Last topic segment for this channel.
    pub fn name(&self) -> &'static str {
        match self {
            Channel::Temperature => "temperature",
            Channel::Humidity => "humidity",
            Channel::HeartRate => "heartrate",
            Channel::AllData => "alldata",
            Channel::Alert => "alert",
            Channel::Status => "status",
        }
    }
}

/// Aggregate sample document.
#[derive(Debug, Serialize)]
struct AllDataPayload<'a> {
    device_id: &'a str,
    temperature: f32,
    humidity: f32,
    #[serde(rename = "heartRate")]
    heart_rate: u16,
    timestamp: Millis,
}

#[derive(Debug, Serialize)]
struct AlertPayload<'a> {
    device_id: &'a str,
    alert_level: String,
    message: &'a str,
    timestamp: Millis,
}

#[derive(Debug, Serialize)]
struct StatusPayload<'a> {
    status: &'a str,
    device: &'a str,
}

/// One encoded message ready for the publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Topic layout and payload builders for one device.
///
/// # Example
///
/// ```
/// use vitals_core::{Channel, Channels};
/// use vitals_types::Sample;
///
/// let channels = Channels::new("wearable-001", "telemetry");
/// assert_eq!(channels.topic(Channel::HeartRate), "telemetry/heartrate");
///
/// let messages = channels.sample_messages(&Sample::new(36.5, 40.0, 72, 1_000)).unwrap();
/// assert_eq!(messages.len(), 4);
/// assert_eq!(messages[0].payload, b"36.5");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channels {
    device_id: String,
    prefix: String,
}

impl Default for Channels {
    fn default() -> Self {
        Self::new("wearable-001", DEFAULT_TOPIC_PREFIX)
    }
}

impl Channels {
    /// Create a channel layout. Slashes around the prefix are trimmed.
    pub fn new(device_id: impl Into<String>, prefix: impl AsRef<str>) -> Self {
        let prefix = prefix.as_ref().trim_matches('/');
        Self {
            device_id: device_id.into(),
            prefix: if prefix.is_empty() {
                DEFAULT_TOPIC_PREFIX.to_string()
            } else {
                prefix.to_string()
            },
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Full topic for a channel.
    pub fn topic(&self, channel: Channel) -> String {
        format!("{}/{}", self.prefix, channel.name())
    }

    /// Encode the four telemetry messages for one sample.
    pub fn sample_messages(&self, sample: &Sample) -> Result<Vec<Message>> {
        let aggregate = serde_json::to_vec(&AllDataPayload {
            device_id: &self.device_id,
            temperature: sample.temperature,
            humidity: sample.humidity,
            heart_rate: sample.heart_rate,
            timestamp: sample.captured_at,
        })?;

        Ok(vec![
            self.message(
                Channel::Temperature,
                format!("{:.1}", sample.temperature).into_bytes(),
            ),
            self.message(
                Channel::Humidity,
                format!("{:.1}", sample.humidity).into_bytes(),
            ),
            self.message(Channel::HeartRate, sample.heart_rate.to_string().into_bytes()),
            self.message(Channel::AllData, aggregate),
        ])
    }

    /// Encode an alert.
    pub fn alert_message(&self, alert: &AlertEvent) -> Result<Message> {
        let payload = serde_json::to_vec(&AlertPayload {
            device_id: &self.device_id,
            alert_level: alert.level.to_string(),
            message: &alert.reason,
            timestamp: alert.sample_ts,
        })?;
        Ok(self.message(Channel::Alert, payload))
    }

    /// Encode a presence announcement.
    pub fn status_message(&self, online: bool) -> Result<Message> {
        let payload = serde_json::to_vec(&StatusPayload {
            status: if online { "online" } else { "offline" },
            device: &self.device_id,
        })?;
        Ok(self.message(Channel::Status, payload))
    }

    fn message(&self, channel: Channel, payload: Vec<u8>) -> Message {
        Message {
            topic: self.topic(channel),
            payload,
        }
    }
}
