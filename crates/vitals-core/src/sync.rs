//! FIFO drain of the offline store.
//!
//! Each tick publishes at most one sample, the oldest unsent one, and only
//! when the pacing interval has elapsed since the previous attempt. A
//! failed attempt leaves the sample pending so the next eligible tick
//! retries the same one. Once nothing is pending the store and the journal
//! are purged together.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use vitals_store::{DurableJournal, OfflineStore, SlotRef};
use vitals_types::{Millis, Sample};

use crate::channels::Channels;
use crate::error::Result;
use crate::traits::Publisher;

/// Minimum gap between two publish attempts.
pub const DEFAULT_PACING_INTERVAL: Duration = Duration::from_secs(2);

/// Whether the engine currently has work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    #[default]
    Idle,
    Draining,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not online; nothing attempted.
    Offline,
    /// Nothing pending.
    Idle,
    /// Work pending but the pacing interval has not elapsed.
    Throttled,
    /// The sample in `slot` was delivered. `purged` is set when this
    /// emptied the store.
    Sent { slot: SlotRef, purged: bool },
    /// Delivery of `slot` failed; it stays pending.
    Failed { slot: SlotRef },
}

/// Running counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub attempts: u64,
    pub sent: u64,
    pub failures: u64,
    pub purges: u64,
}

/// Paced, in-order sync of buffered samples.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    pacing: Duration,
    last_attempt: Option<Millis>,
    state: SyncState,
    stats: SyncStats,
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new(DEFAULT_PACING_INTERVAL)
    }
}

impl SyncEngine {
    pub fn new(pacing: Duration) -> Self {
        Self {
            pacing,
            last_attempt: None,
            state: SyncState::Idle,
            stats: SyncStats::default(),
        }
    }

    pub fn pacing(&self) -> Duration {
        self.pacing
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    pub fn last_attempt(&self) -> Option<Millis> {
        self.last_attempt
    }

    fn ready(&self, now: Millis) -> bool {
        let pacing_ms = u64::try_from(self.pacing.as_millis()).unwrap_or(u64::MAX);
        self.last_attempt
            .is_none_or(|last| now.saturating_sub(last) >= pacing_ms)
    }

    /// Run one step of the drain.
    pub fn tick<P: Publisher + ?Sized>(
        &mut self,
        now: Millis,
        online: bool,
        store: &mut OfflineStore,
        journal: &mut DurableJournal,
        publisher: &mut P,
        channels: &Channels,
    ) -> TickOutcome {
        if !online {
            if self.state == SyncState::Draining {
                debug!(
                    "Sync suspended with {} sample(s) pending",
                    store.pending_count()
                );
            }
            self.state = SyncState::Idle;
            return TickOutcome::Offline;
        }

        let Some((slot, sample)) = store.oldest_pending() else {
            if !store.is_empty() {
                self.purge(store, journal);
            }
            self.state = SyncState::Idle;
            return TickOutcome::Idle;
        };

        if self.state == SyncState::Idle {
            info!("Syncing {} buffered sample(s)", store.pending_count());
            self.state = SyncState::Draining;
        }

        if !self.ready(now) {
            return TickOutcome::Throttled;
        }

        self.last_attempt = Some(now);
        self.stats.attempts += 1;

        match publish_sample(publisher, channels, &sample) {
            Ok(()) => {
                store.mark_sent(slot);
                self.stats.sent += 1;
                debug!(
                    "Synced {} ({} remaining)",
                    sample,
                    store.pending_count()
                );

                let purged = store.is_fully_synced() && self.purge(store, journal);
                if purged {
                    self.state = SyncState::Idle;
                }
                TickOutcome::Sent { slot, purged }
            }
            Err(e) => {
                self.stats.failures += 1;
                warn!("Failed to sync {}: {}; will retry", sample, e);
                TickOutcome::Failed { slot }
            }
        }
    }

    fn purge(&mut self, store: &mut OfflineStore, journal: &mut DurableJournal) -> bool {
        match store.purge_all() {
            Ok(count) => {
                journal.truncate();
                self.stats.purges += 1;
                info!("All data synced; cleared {} sample(s)", count);
                true
            }
            Err(e) => {
                warn!("Purge skipped: {}", e);
                false
            }
        }
    }
}

/// Publish the four telemetry messages of one sample, stopping at the
/// first failure.
pub fn publish_sample<P: Publisher + ?Sized>(
    publisher: &mut P,
    channels: &Channels,
    sample: &Sample,
) -> Result<()> {
    for message in channels.sample_messages(sample)? {
        publisher.publish(&message.topic, &message.payload)?;
    }
    Ok(())
}
