//! Capabilities the core needs from the outside world.
//!
//! The core never talks to a network stack or a sensor bus directly. It
//! drives a [`Publisher`] for the broker session and pulls readings from a
//! [`SampleSource`]. Both are synchronous: any implementation that can block
//! must bound its own calls, and the core defers retries to the next tick.

use vitals_types::{Millis, Sample};

use crate::error::Result;

/// Broker session used for telemetry, alerts and status.
///
/// # Example
///
/// ```
/// use vitals_core::{MockPublisher, Publisher};
///
/// let mut publisher = MockPublisher::new();
/// publisher.connect("wearable-001").unwrap();
/// // Connecting twice is harmless.
/// publisher.connect("wearable-001").unwrap();
/// publisher.publish("telemetry/status", b"{}").unwrap();
/// assert_eq!(publisher.published().len(), 1);
/// ```
pub trait Publisher {
    /// Establish the session. Must be a no-op when already connected.
    fn connect(&mut self, client_id: &str) -> Result<()>;

    /// Publish one payload to one topic.
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()>;

    /// Tear down the session.
    fn disconnect(&mut self) -> Result<()>;

    /// Whether the session is currently usable.
    fn is_connected(&self) -> bool;
}

impl<P: Publisher + ?Sized> Publisher for Box<P> {
    fn connect(&mut self, client_id: &str) -> Result<()> {
        (**self).connect(client_id)
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
        (**self).publish(topic, payload)
    }

    fn disconnect(&mut self) -> Result<()> {
        (**self).disconnect()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}

/// Produces one sample per acquisition.
pub trait SampleSource {
    /// Read the sensors. `None` means the reading failed and nothing must
    /// be admitted.
    fn acquire(&mut self, now: Millis) -> Option<Sample>;
}
