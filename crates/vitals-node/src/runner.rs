//! Tick loop driving the node.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{debug, info};

use vitals_core::{Millis, NodeStatus, Publisher, SampleSource, TelemetryNode, TickOutcome};
use vitals_store::DurableJournal;

use crate::config::{Config, StorageConfig};
use crate::simulator::SimulatedNetwork;

/// How often a status summary is logged.
const STATUS_LOG_INTERVAL: Millis = 60_000;

/// Open the journal described by the storage settings.
pub fn open_journal(storage: &StorageConfig) -> DurableJournal {
    if storage.memory_only {
        info!("Journal disabled, buffering in memory only");
        DurableJournal::disabled()
    } else {
        DurableJournal::open(&storage.journal_path)
    }
}

/// Feeds network signals, samples and ticks into a [`TelemetryNode`].
pub struct Runner<P, S> {
    node: TelemetryNode<P>,
    sensor: S,
    network: SimulatedNetwork,
    tick_interval: Duration,
    sampling_interval: Millis,
    last_sample: Option<Millis>,
    last_status_log: Millis,
}

impl<P: Publisher, S: SampleSource> Runner<P, S> {
    pub fn new(
        config: &Config,
        node: TelemetryNode<P>,
        sensor: S,
        network: SimulatedNetwork,
    ) -> Self {
        Self {
            node,
            sensor,
            network,
            tick_interval: Duration::from_millis(config.sync.tick_interval_ms.max(1)),
            sampling_interval: config.sampling.interval_ms,
            last_sample: None,
            last_status_log: 0,
        }
    }

    pub fn node(&self) -> &TelemetryNode<P> {
        &self.node
    }

    /// Run until `shutdown` resolves, then close the session and return the
    /// final status.
    pub async fn run<F>(mut self, shutdown: F) -> NodeStatus
    where
        F: Future<Output = ()>,
    {
        let started = Instant::now();
        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            "Node {} running (tick {:?}, sampling every {}ms)",
            self.node.channels().device_id(),
            self.tick_interval,
            self.sampling_interval
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = u64::try_from(started.elapsed().as_millis()).unwrap_or(Millis::MAX);
                    self.step(now);
                }
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        self.node.shutdown();
        self.node.status()
    }

    /// One scheduler step at uptime `now`.
    pub fn step(&mut self, now: Millis) -> TickOutcome {
        self.node.observe_network(self.network.is_up(now));

        let sample_due = self
            .last_sample
            .is_none_or(|last| now.saturating_sub(last) >= self.sampling_interval);
        if sample_due {
            self.last_sample = Some(now);
            let reading = self.sensor.acquire(now);
            match self.node.ingest(reading, now) {
                Ok(admission) => debug!("Ingested at {}ms: {:?}", now, admission.sync),
                Err(e) => debug!("Ingest at {}ms skipped: {}", now, e),
            }
        }

        let outcome = self.node.tick(now);

        if now.saturating_sub(self.last_status_log) >= STATUS_LOG_INTERVAL {
            self.last_status_log = now;
            let status = self.node.status();
            info!(
                "Status: {:?}, {} pending / {} stored, {} sent, {} evicted",
                status.connectivity,
                status.pending,
                status.stored,
                status.sync.sent,
                status.evicted_unsent
            );
        }

        outcome
    }
}
