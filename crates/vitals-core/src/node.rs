//! The telemetry node: ties the store, journal, connectivity model, sync
//! engine and alert evaluator together.
//!
//! The node owns no clock and no thread. The caller feeds it network
//! signals, sensor readings and ticks, each stamped with device uptime.
//! Every operation returns quickly and never fails the caller for a
//! transient condition.

use std::collections::HashSet;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use vitals_store::{DEFAULT_CAPACITY, DurableJournal, OfflineStore, SlotRef};
use vitals_types::{AlertEvent, Millis, Sample};

use crate::channels::{Channels, DEFAULT_TOPIC_PREFIX};
use crate::connectivity::{ConnectivityMonitor, ConnectivityState, Transition};
use crate::error::{Error, Result};
use crate::sync::{DEFAULT_PACING_INTERVAL, SyncEngine, SyncState, SyncStats, TickOutcome};
use crate::thresholds::{AlertEvaluator, AlertThresholds};
use crate::traits::Publisher;

/// Default minimum gap between broker connection attempts.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

/// Options for building a [`TelemetryNode`].
#[derive(Debug, Clone)]
pub struct NodeOptions {
    /// Client identifier and `device_id` in payloads.
    pub device_id: String,
    /// Topic prefix.
    pub topic_prefix: String,
    /// Offline store capacity.
    pub capacity: usize,
    /// Minimum gap between publish attempts.
    pub pacing_interval: Duration,
    /// Minimum gap between broker connection attempts.
    pub reconnect_interval: Duration,
    /// Alert bounds.
    pub thresholds: AlertThresholds,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            device_id: "wearable-001".to_string(),
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
            capacity: DEFAULT_CAPACITY,
            pacing_interval: DEFAULT_PACING_INTERVAL,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            thresholds: AlertThresholds::default(),
        }
    }
}

impl NodeOptions {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            ..Default::default()
        }
    }

    pub fn topic_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.topic_prefix = prefix.into();
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn pacing_interval(mut self, interval: Duration) -> Self {
        self.pacing_interval = interval;
        self
    }

    pub fn reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    pub fn thresholds(mut self, thresholds: AlertThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Check the options before boot.
    pub fn validate(&self) -> Result<()> {
        if self.device_id.trim().is_empty() {
            return Err(Error::InvalidConfig("device_id cannot be empty".into()));
        }
        if self.capacity == 0 {
            return Err(Error::InvalidConfig("capacity must be at least 1".into()));
        }
        self.thresholds.validate()
    }
}

/// Result of a successful [`TelemetryNode::ingest`].
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    /// Where the sample landed.
    pub slot: SlotRef,
    /// Alert raised by the sample, if any.
    pub alert: Option<AlertEvent>,
    /// Outcome of the opportunistic sync attempt.
    pub sync: TickOutcome,
}

/// Point-in-time view of the node.
#[derive(Debug, Clone, Serialize)]
pub struct NodeStatus {
    pub device_id: String,
    pub connectivity: ConnectivityState,
    pub transport_connected: bool,
    pub sync_state: SyncState,
    pub stored: usize,
    pub pending: usize,
    pub capacity: usize,
    pub evicted_unsent: u64,
    pub rejected: u64,
    pub journal_available: bool,
    pub sync: SyncStats,
}

/// Offline-first telemetry node.
///
/// # Example
///
/// ```
/// use vitals_core::{MockPublisher, NodeOptions, TelemetryNode};
/// use vitals_store::DurableJournal;
/// use vitals_types::Sample;
///
/// let mut node = TelemetryNode::boot(
///     NodeOptions::new("wearable-001"),
///     DurableJournal::disabled(),
///     MockPublisher::new(),
/// )
/// .unwrap();
///
/// // Offline: the sample is buffered.
/// node.ingest(Some(Sample::new(36.6, 45.0, 72, 0)), 0).unwrap();
/// assert_eq!(node.status().pending, 1);
///
/// // Network up: the next tick connects and drains.
/// node.observe_network(true);
/// node.tick(1_000);
/// assert_eq!(node.status().pending, 0);
/// ```
pub struct TelemetryNode<P> {
    channels: Channels,
    reconnect_interval: Duration,
    store: OfflineStore,
    journal: DurableJournal,
    monitor: ConnectivityMonitor,
    engine: SyncEngine,
    evaluator: AlertEvaluator,
    publisher: P,
    // Slots whose alert was attempted at admission.
    alerted: HashSet<SlotRef>,
    last_connect_attempt: Option<Millis>,
    rejected: u64,
}

impl<P> std::fmt::Debug for TelemetryNode<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryNode")
            .field("device_id", &self.channels.device_id())
            .field("state", &self.monitor.state())
            .field("pending", &self.store.pending_count())
            .field("journal", &self.journal)
            .finish()
    }
}

impl<P: Publisher> TelemetryNode<P> {
    /// Build the node and restore unsent samples from the journal.
    ///
    /// The node starts `Disconnected`; nothing is published until a network
    /// signal arrives.
    pub fn boot(options: NodeOptions, journal: DurableJournal, publisher: P) -> Result<Self> {
        options.validate()?;

        let mut store = OfflineStore::new(options.capacity)?;
        let mut journal = journal.with_replay_limit(options.capacity);

        if journal.is_available() {
            let restored = store.restore(journal.replay());
            if restored > 0 {
                info!("Restored {} unsent sample(s) from journal", restored);
            } else {
                debug!("Journal empty, starting fresh");
            }
        } else {
            warn!("Journal unavailable; buffering in memory only");
        }

        Ok(Self {
            channels: Channels::new(options.device_id, &options.topic_prefix),
            reconnect_interval: options.reconnect_interval,
            store,
            journal,
            monitor: ConnectivityMonitor::new(),
            engine: SyncEngine::new(options.pacing_interval),
            evaluator: AlertEvaluator::new(options.thresholds),
            publisher,
            alerted: HashSet::new(),
            last_connect_attempt: None,
            rejected: 0,
        })
    }

    /// Feed the latest network signal.
    pub fn observe_network(&mut self, network_up: bool) -> Option<Transition> {
        let transition = self.monitor.observe(network_up);
        match transition {
            Some(Transition::ToDisconnected) => {
                if let Err(e) = self.publisher.disconnect() {
                    debug!("Disconnect after network loss: {}", e);
                }
                info!(
                    "Buffering locally, {} sample(s) pending",
                    self.store.pending_count()
                );
            }
            Some(Transition::ToConnected) => {
                self.last_connect_attempt = None;
                if self.store.pending_count() > 0 {
                    info!(
                        "{} sample(s) waiting for broker session",
                        self.store.pending_count()
                    );
                }
            }
            None => {}
        }
        transition
    }

    /// Admit one reading, evaluate alerts and try to sync.
    ///
    /// `None` stands for a failed acquisition and admits nothing.
    pub fn ingest(&mut self, sample: Option<Sample>, now: Millis) -> Result<Admission> {
        let Some(sample) = sample else {
            self.rejected += 1;
            warn!("Sensor read failed, sample dropped");
            return Err(Error::AcquisitionFailed);
        };

        let slot = match self.store.admit(sample) {
            Ok(slot) => slot,
            Err(e) => {
                self.rejected += 1;
                warn!("Rejected {}: {}", sample, e);
                return Err(e.into());
            }
        };
        self.journal.append(&sample);
        debug!("Admitted {}", sample);

        let alert = self.evaluator.evaluate(&sample);
        if let Some(alert) = &alert
            && self.publish_alert(alert)
        {
            let store = &self.store;
            self.alerted.retain(|s| store.get(*s).is_some());
            self.alerted.insert(slot);
        }

        self.refresh_transport();
        let sync = self.drain(now);

        Ok(Admission { slot, alert, sync })
    }

    /// Periodic maintenance: reconnect when due, then drain one sample.
    pub fn tick(&mut self, now: Millis) -> TickOutcome {
        self.maintain_session(now);
        self.drain(now)
    }

    /// Snapshot of the node.
    pub fn status(&self) -> NodeStatus {
        NodeStatus {
            device_id: self.channels.device_id().to_string(),
            connectivity: self.monitor.state(),
            transport_connected: self.monitor.is_transport_up(),
            sync_state: self.engine.state(),
            stored: self.store.len(),
            pending: self.store.pending_count(),
            capacity: self.store.capacity(),
            evicted_unsent: self.store.evicted_unsent(),
            rejected: self.rejected,
            journal_available: self.journal.is_available(),
            sync: self.engine.stats(),
        }
    }

    /// Announce departure and close the session. Buffered samples stay in
    /// the journal for the next boot.
    pub fn shutdown(&mut self) {
        if self.publisher.is_connected() {
            self.announce(false);
            if let Err(e) = self.publisher.disconnect() {
                debug!("Disconnect on shutdown: {}", e);
            }
        }
        self.monitor.observe_transport(false);
        info!(
            "Node stopped with {} sample(s) pending",
            self.store.pending_count()
        );
    }

    pub fn store(&self) -> &OfflineStore {
        &self.store
    }

    pub fn journal(&self) -> &DurableJournal {
        &self.journal
    }

    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    pub fn channels(&self) -> &Channels {
        &self.channels
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn publisher_mut(&mut self) -> &mut P {
        &mut self.publisher
    }

    fn maintain_session(&mut self, now: Millis) {
        if self.monitor.is_network_up() && !self.publisher.is_connected() {
            let interval_ms = u64::try_from(self.reconnect_interval.as_millis()).unwrap_or(u64::MAX);
            let due = self
                .last_connect_attempt
                .is_none_or(|last| now.saturating_sub(last) >= interval_ms);

            if due {
                self.last_connect_attempt = Some(now);
                match self.publisher.connect(self.channels.device_id()) {
                    Ok(()) => {}
                    Err(Error::ConnectPending) => debug!("Broker handshake in progress"),
                    Err(e) => warn!(
                        "Broker connection failed: {}; retrying in {:?}",
                        e, self.reconnect_interval
                    ),
                }
            }
        }
        self.refresh_transport();
    }

    fn refresh_transport(&mut self) {
        let session_up = self.publisher.is_connected();
        if self.monitor.observe_transport(session_up) {
            if self.monitor.is_transport_up() {
                info!("Broker session established");
                self.announce(true);
            } else {
                warn!("Broker session lost");
            }
        }
    }

    /// Run one sync step. A sample admitted while offline gets its alert
    /// published once its telemetry is delivered.
    fn drain(&mut self, now: Millis) -> TickOutcome {
        let head = self.store.oldest_pending();
        let outcome = self.engine.tick(
            now,
            self.monitor.is_online(),
            &mut self.store,
            &mut self.journal,
            &mut self.publisher,
            &self.channels,
        );

        match outcome {
            TickOutcome::Sent { slot, purged } => {
                let alerted = self.alerted.remove(&slot);
                if !alerted
                    && let Some((head_slot, sample)) = head
                    && head_slot == slot
                    && let Some(alert) = self.evaluator.evaluate(&sample)
                {
                    debug!("Publishing deferred alert for {}", sample);
                    self.publish_alert(&alert);
                }
                if purged {
                    self.alerted.clear();
                }
            }
            TickOutcome::Idle if self.store.is_empty() => self.alerted.clear(),
            _ => {}
        }
        outcome
    }

    fn announce(&mut self, online: bool) {
        let result = self
            .channels
            .status_message(online)
            .and_then(|m| self.publisher.publish(&m.topic, &m.payload));
        if let Err(e) = result {
            debug!("Status announcement failed: {}", e);
        }
    }

    /// Fire-and-forget alert publication. Returns `false` when offline,
    /// in which case nothing was attempted.
    fn publish_alert(&mut self, alert: &AlertEvent) -> bool {
        warn!("{} alert: {}", alert.level, alert.reason);
        if !self.monitor.is_online() {
            debug!("Offline, alert deferred until the sample syncs");
            return false;
        }
        let result = self
            .channels
            .alert_message(alert)
            .and_then(|m| self.publisher.publish(&m.topic, &m.payload));
        if let Err(e) = result {
            warn!("Alert publish failed: {}", e);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPublisher;

    fn node() -> TelemetryNode<MockPublisher> {
        TelemetryNode::boot(
            NodeOptions::new("wearable-001"),
            DurableJournal::disabled(),
            MockPublisher::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_boot_starts_disconnected() {
        let node = node();
        let status = node.status();
        assert_eq!(status.connectivity, ConnectivityState::Disconnected);
        assert!(!status.transport_connected);
        assert_eq!(status.capacity, DEFAULT_CAPACITY);
        assert!(!status.journal_available);
    }

    #[test]
    fn test_boot_rejects_invalid_options() {
        let result = TelemetryNode::boot(
            NodeOptions::new("dev").capacity(0),
            DurableJournal::disabled(),
            MockPublisher::new(),
        );
        assert!(matches!(result, Err(Error::InvalidConfig(_))));

        let result = TelemetryNode::boot(
            NodeOptions::new("  "),
            DurableJournal::disabled(),
            MockPublisher::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_failed_acquisition_admits_nothing() {
        let mut node = node();
        assert!(matches!(
            node.ingest(None, 0),
            Err(Error::AcquisitionFailed)
        ));
        assert_eq!(node.status().stored, 0);
        assert_eq!(node.status().rejected, 1);
    }

    #[test]
    fn test_invalid_sample_rejected() {
        let mut node = node();
        let result = node.ingest(Some(Sample::new(f32::NAN, 50.0, 70, 0)), 0);
        assert!(matches!(result, Err(Error::Store(_))));
        assert_eq!(node.status().stored, 0);
    }

    #[test]
    fn test_connect_announces_online_status() {
        let mut node = node();
        node.observe_network(true);
        node.tick(0);

        assert!(node.status().transport_connected);
        let status = node.publisher().published_on("status");
        assert_eq!(status.len(), 1);
        assert!(status[0].text().contains(r#""status":"online""#));
        assert_eq!(node.publisher().client_id(), Some("wearable-001"));
    }

    #[test]
    fn test_reconnect_is_paced() {
        let mut node = node();
        node.publisher_mut().set_refuse_connect(true);
        node.observe_network(true);

        node.tick(0);
        node.tick(1_000);
        node.tick(4_999);
        assert_eq!(node.publisher().connect_attempts(), 1);

        node.tick(5_000);
        assert_eq!(node.publisher().connect_attempts(), 2);

        node.publisher_mut().set_refuse_connect(false);
        node.tick(10_000);
        assert!(node.status().transport_connected);
    }

    #[test]
    fn test_network_loss_disconnects_publisher() {
        let mut node = node();
        node.observe_network(true);
        node.tick(0);
        assert!(node.publisher().is_connected());

        assert_eq!(node.observe_network(false), Some(Transition::ToDisconnected));
        assert!(!node.publisher().is_connected());
        assert!(!node.status().transport_connected);
    }

    #[test]
    fn test_broker_drop_detected_on_tick() {
        let mut node = node();
        node.observe_network(true);
        node.tick(0);
        assert!(node.status().transport_connected);

        node.publisher_mut().drop_session();
        node.publisher_mut().set_refuse_connect(true);
        node.tick(100);
        assert!(!node.status().transport_connected);
        assert_eq!(node.status().connectivity, ConnectivityState::Connected);
    }

    #[test]
    fn test_offline_alert_published_when_sample_syncs() {
        let mut node = node();
        let admission = node
            .ingest(Some(Sample::new(38.5, 50.0, 90, 0)), 0)
            .unwrap();
        assert!(admission.alert.is_some());
        assert!(node.publisher().published_on("alert").is_empty());

        node.observe_network(true);
        node.tick(0);
        let alerts = node.publisher().published_on("alert");
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].text().contains("CRITICAL"));
    }

    #[test]
    fn test_online_alert_not_repeated_on_sync() {
        let mut node = node();
        node.observe_network(true);
        node.tick(0);
        node.ingest(Some(Sample::new(36.5, 50.0, 70, 0)), 0)
            .unwrap();
        assert_eq!(node.status().pending, 0);

        // Pacing holds the second sample back, but its alert goes out now.
        node.ingest(Some(Sample::new(36.5, 50.0, 110, 10)), 10)
            .unwrap();
        assert_eq!(node.status().pending, 1);
        assert_eq!(node.publisher().published_on("alert").len(), 1);

        node.tick(2_000);
        assert_eq!(node.status().pending, 0);
        assert_eq!(node.publisher().published_on("alert").len(), 1);
    }

    #[test]
    fn test_shutdown_announces_offline() {
        let mut node = node();
        node.observe_network(true);
        node.tick(0);
        node.shutdown();

        let status = node.publisher().published_on("status");
        assert_eq!(status.len(), 2);
        assert!(status[1].text().contains("offline"));
        assert!(!node.publisher().is_connected());
    }

    #[test]
    fn test_status_serializes() {
        let node = node();
        let json = serde_json::to_value(node.status()).unwrap();
        assert_eq!(json["connectivity"], "disconnected");
        assert_eq!(json["sync_state"], "idle");
        assert_eq!(json["sync"]["attempts"], 0);
    }
}
