//! Offline-first sync core for a wearable vitals node.
//!
//! This crate decides when buffered readings may leave the device and in
//! which order. It is transport-agnostic: the broker session is reached
//! through the [`Publisher`] trait and time is passed in explicitly as
//! device uptime, so every component can be driven deterministically.
//!
//! # Features
//!
//! - **Connectivity model**: network edges and broker session tracked separately
//! - **FIFO sync**: one sample per paced attempt, retried until delivered
//! - **Purge on completion**: store and journal cleared once fully synced
//! - **Alerts**: temperature and heart-rate thresholds, published best-effort
//! - **Mock publisher**: failure injection for tests
//!
//! # Quick Start
//!
//! ```
//! use vitals_core::{MockPublisher, NodeOptions, TelemetryNode, TickOutcome};
//! use vitals_store::DurableJournal;
//! use vitals_types::Sample;
//!
//! let mut node = TelemetryNode::boot(
//!     NodeOptions::new("wearable-001"),
//!     DurableJournal::disabled(),
//!     MockPublisher::new(),
//! )?;
//!
//! node.observe_network(true);
//! node.tick(0);
//!
//! let admission = node.ingest(Some(Sample::new(36.7, 44.0, 71, 100)), 100)?;
//! assert!(matches!(admission.sync, TickOutcome::Sent { purged: true, .. }));
//! # Ok::<(), vitals_core::Error>(())
//! ```

pub mod channels;
pub mod connectivity;
pub mod error;
pub mod heart_rate;
pub mod mock;
pub mod node;
pub mod sync;
pub mod thresholds;
pub mod traits;

pub use channels::{Channel, Channels, DEFAULT_TOPIC_PREFIX, Message};
pub use connectivity::{ConnectivityMonitor, ConnectivityState, Transition};
pub use error::{Error, Result};
pub use heart_rate::HeartRateWalk;
pub use mock::{MockPublisher, PublishedMessage};
pub use node::{Admission, DEFAULT_RECONNECT_INTERVAL, NodeOptions, NodeStatus, TelemetryNode};
pub use sync::{
    DEFAULT_PACING_INTERVAL, SyncEngine, SyncState, SyncStats, TickOutcome, publish_sample,
};
pub use thresholds::{AlertEvaluator, AlertThresholds};
pub use traits::{Publisher, SampleSource};

// Re-export the shared types so downstream crates need only one import.
pub use vitals_types::{AlertEvent, AlertLevel, Millis, Sample};
