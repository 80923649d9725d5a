//! Error types for vitals-core.
//!
//! # Error Recovery
//!
//! Nothing in the core is allowed to stop the node. Each error maps to a
//! recovery policy instead:
//!
//! | Error | Policy |
//! |-------|--------|
//! | [`Error::NotConnected`] | Wait for the next tick; the node reconnects on its own |
//! | [`Error::ConnectPending`] | Handshake in flight, check again next tick |
//! | [`Error::Transport`] / [`Error::Publish`] | Retry the same sample at the pacing cadence |
//! | [`Error::AcquisitionFailed`] | Drop the reading, sample again next interval |
//! | [`Error::Store`] with an invalid sample | Drop the reading |
//! | [`Error::InvalidConfig`] | Fix configuration and restart |

use thiserror::Error;

/// Errors that can occur in the vitals core.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Operation attempted while the broker session is down.
    #[error("Not connected to broker")]
    NotConnected,

    /// A connection attempt is in progress but not yet acknowledged.
    #[error("Broker connection pending")]
    ConnectPending,

    /// Generic transport failure reported by the publisher.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A single publish was rejected.
    #[error("Publish to '{topic}' failed: {reason}")]
    Publish {
        /// Topic that was being published to.
        topic: String,
        /// Why the publish failed.
        reason: String,
    },

    /// The sensor returned no usable reading.
    #[error("Sensor acquisition failed")]
    AcquisitionFailed,

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Offline store rejected an operation.
    #[error("Store error: {0}")]
    Store(#[from] vitals_store::Error),

    /// Payload encoding failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using vitals-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether retrying the same operation later can succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::NotConnected
                | Error::ConnectPending
                | Error::Transport(_)
                | Error::Publish { .. }
        )
    }
}
