//! Mock publisher implementation for testing.
//!
//! This module provides a broker stand-in that records every message and
//! can be told to fail, so the sync engine and node can be exercised
//! without a real broker.
//!
//! # Features
//!
//! - **Failure injection**: fail every publish, the next N publishes, or
//!   every connect attempt
//! - **Session drop**: simulate the broker closing the session
//! - **Inspection**: every accepted message is kept in order

use crate::error::{Error, Result};
use crate::traits::Publisher;

/// A message accepted by [`MockPublisher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl PublishedMessage {
    /// Payload as text.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// A mock broker session for testing.
///
/// # Example
///
/// ```
/// use vitals_core::{MockPublisher, Publisher};
///
/// let mut publisher = MockPublisher::new().connected();
/// publisher.fail_next(1);
/// assert!(publisher.publish("telemetry/humidity", b"40.0").is_err());
/// assert!(publisher.publish("telemetry/humidity", b"40.0").is_ok());
/// assert_eq!(publisher.published().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockPublisher {
    connected: bool,
    client_id: Option<String>,
    published: Vec<PublishedMessage>,
    publish_attempts: u32,
    connect_attempts: u32,
    should_fail: bool,
    refuse_connect: bool,
    /// Number of publishes to fail before succeeding again.
    remaining_failures: u32,
}

impl MockPublisher {
    /// Create a disconnected mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the session already established.
    pub fn connected(mut self) -> Self {
        self.connected = true;
        self
    }

    /// Make every publish fail (or succeed again).
    pub fn set_should_fail(&mut self, fail: bool) {
        self.should_fail = fail;
    }

    /// Fail the next `count` publishes, then succeed.
    pub fn fail_next(&mut self, count: u32) {
        self.remaining_failures = count;
    }

    /// Make connect attempts fail (or succeed again).
    pub fn set_refuse_connect(&mut self, refuse: bool) {
        self.refuse_connect = refuse;
    }

    /// Simulate the broker closing the session.
    pub fn drop_session(&mut self) {
        self.connected = false;
    }

    /// Client identifier from the last successful connect.
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn published(&self) -> &[PublishedMessage] {
        &self.published
    }

    /// Messages whose topic ends with `/{channel}`.
    pub fn published_on(&self, channel: &str) -> Vec<&PublishedMessage> {
        let suffix = format!("/{}", channel);
        self.published
            .iter()
            .filter(|m| m.topic.ends_with(&suffix))
            .collect()
    }

    pub fn clear_published(&mut self) {
        self.published.clear();
    }

    /// Publish calls made, including failed ones.
    pub fn publish_attempts(&self) -> u32 {
        self.publish_attempts
    }

    /// Connect calls made while disconnected.
    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts
    }
}

impl Publisher for MockPublisher {
    fn connect(&mut self, client_id: &str) -> Result<()> {
        if self.connected {
            return Ok(());
        }
        self.connect_attempts += 1;
        if self.refuse_connect {
            return Err(Error::Transport("mock broker refused connection".into()));
        }
        self.connected = true;
        self.client_id = Some(client_id.to_string());
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
        self.publish_attempts += 1;
        if !self.connected {
            return Err(Error::NotConnected);
        }
        if self.should_fail || self.remaining_failures > 0 {
            self.remaining_failures = self.remaining_failures.saturating_sub(1);
            return Err(Error::Publish {
                topic: topic.to_string(),
                reason: "mock failure".into(),
            });
        }
        self.published.push(PublishedMessage {
            topic: topic.to_string(),
            payload: payload.to_vec(),
        });
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
