//! Bounded in-memory ring of admitted samples.
//!
//! The offline store owns admission policy and pending bookkeeping. When
//! full, the next admission overwrites the logically oldest slot whether or
//! not it was sent; memory stays bounded at the cost of losing the oldest
//! unsent data under a long outage. Every such loss is counted in
//! [`OfflineStore::evicted_unsent`].

use tracing::{debug, warn};

use vitals_types::Sample;

use crate::error::{Error, Result};

/// Default number of slots.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Handle to one admission.
///
/// Carries the admission sequence number so a handle that outlived its
/// sample (overwritten or purged) can never mark a newer sample as sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotRef {
    index: usize,
    seq: u64,
}

impl SlotRef {
    /// Ring index of the slot.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Admission sequence number, unique for the life of the store.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    sample: Sample,
    seq: u64,
}

/// Fixed-capacity ring buffer with pending tracking.
#[derive(Debug, Clone)]
pub struct OfflineStore {
    slots: Vec<Option<Slot>>,
    next_write_index: usize,
    len: usize,
    pending_count: usize,
    next_seq: u64,
    evicted_unsent: u64,
}

impl Default for OfflineStore {
    fn default() -> Self {
        Self::with_slots(DEFAULT_CAPACITY)
    }
}

impl OfflineStore {
    /// Create a store with room for `capacity` samples.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity(capacity));
        }
        Ok(Self::with_slots(capacity))
    }

    fn with_slots(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            next_write_index: 0,
            len: 0,
            pending_count: 0,
            next_seq: 0,
            evicted_unsent: 0,
        }
    }

    /// Maximum number of samples held at once.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots, sent or not.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Samples admitted but not yet confirmed delivered.
    pub fn pending_count(&self) -> usize {
        self.pending_count
    }

    /// Slot the next admission will write to.
    pub fn next_write_index(&self) -> usize {
        self.next_write_index
    }

    /// Unsent samples lost to overwrites since the store was created.
    pub fn evicted_unsent(&self) -> u64 {
        self.evicted_unsent
    }

    /// Admit a sample, overwriting the oldest slot when full.
    ///
    /// Invalid samples are rejected and leave the store untouched.
    pub fn admit(&mut self, sample: Sample) -> Result<SlotRef> {
        sample.validate()?;

        let index = self.next_write_index;
        let seq = self.next_seq;
        self.next_seq += 1;

        match self.slots[index].replace(Slot { sample, seq }) {
            Some(evicted) => {
                if !evicted.sample.sent {
                    self.pending_count -= 1;
                    self.evicted_unsent += 1;
                    warn!(
                        "Offline store full ({}); dropped unsent sample {}",
                        self.capacity(),
                        evicted.sample
                    );
                }
            }
            None => self.len += 1,
        }

        if !sample.sent {
            self.pending_count += 1;
        }
        self.next_write_index = (index + 1) % self.capacity();

        Ok(SlotRef { index, seq })
    }

    /// Re-admit samples replayed from the journal, in order.
    ///
    /// Returns how many were admitted; invalid samples are skipped.
    pub fn restore<I>(&mut self, samples: I) -> usize
    where
        I: IntoIterator<Item = Sample>,
    {
        let mut restored = 0;
        for sample in samples {
            match self.admit(sample) {
                Ok(_) => restored += 1,
                Err(e) => debug!("Not restoring {}: {}", sample, e),
            }
        }
        restored
    }

    /// Look up the sample behind a handle, if it is still stored.
    pub fn get(&self, slot: SlotRef) -> Option<&Sample> {
        self.slots
            .get(slot.index)
            .and_then(Option::as_ref)
            .filter(|s| s.seq == slot.seq)
            .map(|s| &s.sample)
    }

    /// All unsent samples, oldest first.
    pub fn pending(&self) -> Vec<(SlotRef, Sample)> {
        self.iter_ordered().filter(|(_, s)| !s.sent).collect()
    }

    /// The oldest unsent sample.
    pub fn oldest_pending(&self) -> Option<(SlotRef, Sample)> {
        self.iter_ordered().find(|(_, s)| !s.sent)
    }

    /// Mark a sample as delivered.
    ///
    /// Idempotent: returns `true` only when this call flipped the flag.
    /// Stale handles are ignored.
    pub fn mark_sent(&mut self, slot: SlotRef) -> bool {
        let Some(Some(stored)) = self.slots.get_mut(slot.index) else {
            return false;
        };
        if stored.seq != slot.seq || stored.sample.sent {
            return false;
        }
        stored.sample.sent = true;
        self.pending_count -= 1;
        true
    }

    /// Whether every admitted sample has been delivered.
    pub fn is_fully_synced(&self) -> bool {
        self.pending_count == 0
    }

    /// Drop every sample and reset the ring.
    ///
    /// Refuses while anything is still pending, so unsent data is never
    /// discarded by a purge.
    pub fn purge_all(&mut self) -> Result<usize> {
        if !self.is_fully_synced() {
            return Err(Error::UnsyncedEntries {
                pending: self.pending_count,
            });
        }

        let purged = self.len;
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.next_write_index = 0;
        self.len = 0;
        Ok(purged)
    }

    fn iter_ordered(&self) -> impl Iterator<Item = (SlotRef, Sample)> + '_ {
        let capacity = self.capacity();
        // Below capacity the ring has never wrapped since the last purge,
        // so occupied slots are exactly 0..len.
        let start = if self.len == capacity {
            self.next_write_index
        } else {
            0
        };

        (0..self.len).filter_map(move |offset| {
            let index = (start + offset) % capacity;
            self.slots[index].map(|slot| {
                (
                    SlotRef {
                        index,
                        seq: slot.seq,
                    },
                    slot.sample,
                )
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ts: u64) -> Sample {
        Sample::new(36.6, 45.0, 72, ts)
    }

    fn pending_ts(store: &OfflineStore) -> Vec<u64> {
        store.pending().iter().map(|(_, s)| s.captured_at).collect()
    }

    #[test]
    fn test_default_capacity() {
        let store = OfflineStore::default();
        assert_eq!(store.capacity(), DEFAULT_CAPACITY);
        assert!(store.is_empty());
        assert!(store.is_fully_synced());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            OfflineStore::new(0),
            Err(Error::InvalidCapacity(0))
        ));
    }

    #[test]
    fn test_pending_in_insertion_order() {
        let mut store = OfflineStore::new(8).unwrap();
        for ts in [10, 20, 30] {
            store.admit(sample(ts)).unwrap();
        }
        assert_eq!(pending_ts(&store), vec![10, 20, 30]);
        assert_eq!(store.pending_count(), 3);
        assert_eq!(store.next_write_index(), 3);
    }

    #[test]
    fn test_overflow_evicts_exactly_the_oldest() {
        let mut store = OfflineStore::new(3).unwrap();
        for ts in 1..=4 {
            store.admit(sample(ts)).unwrap();
        }
        assert_eq!(pending_ts(&store), vec![2, 3, 4]);
        assert_eq!(store.pending_count(), 3);
        assert_eq!(store.evicted_unsent(), 1);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_overwriting_sent_slot_is_not_a_loss() {
        let mut store = OfflineStore::new(2).unwrap();
        let first = store.admit(sample(1)).unwrap();
        store.admit(sample(2)).unwrap();
        assert!(store.mark_sent(first));

        store.admit(sample(3)).unwrap();
        assert_eq!(store.evicted_unsent(), 0);
        assert_eq!(pending_ts(&store), vec![2, 3]);
        assert_eq!(store.pending_count(), 2);
    }

    #[test]
    fn test_mark_sent_is_idempotent() {
        let mut store = OfflineStore::new(4).unwrap();
        let slot = store.admit(sample(1)).unwrap();
        store.admit(sample(2)).unwrap();

        assert!(store.mark_sent(slot));
        assert!(!store.mark_sent(slot));
        assert_eq!(store.pending_count(), 1);
        assert!(store.get(slot).unwrap().sent);
    }

    #[test]
    fn test_stale_handle_cannot_mark_newer_sample() {
        let mut store = OfflineStore::new(1).unwrap();
        let old = store.admit(sample(1)).unwrap();
        let new = store.admit(sample(2)).unwrap();
        assert_eq!(old.index(), new.index());

        assert!(!store.mark_sent(old));
        assert!(store.get(old).is_none());
        assert_eq!(store.pending_count(), 1);
    }

    #[test]
    fn test_oldest_pending_skips_sent() {
        let mut store = OfflineStore::new(4).unwrap();
        let a = store.admit(sample(1)).unwrap();
        store.admit(sample(2)).unwrap();
        store.mark_sent(a);

        let (_, oldest) = store.oldest_pending().unwrap();
        assert_eq!(oldest.captured_at, 2);
    }

    #[test]
    fn test_purge_refused_while_pending() {
        let mut store = OfflineStore::new(4).unwrap();
        store.admit(sample(1)).unwrap();

        let err = store.purge_all().unwrap_err();
        assert!(matches!(err, Error::UnsyncedEntries { pending: 1 }));
        assert_eq!(store.pending_count(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_purge_after_full_sync_resets_ring() {
        let mut store = OfflineStore::new(3).unwrap();
        let slots: Vec<_> = (1..=3).map(|ts| store.admit(sample(ts)).unwrap()).collect();
        for slot in &slots {
            store.mark_sent(*slot);
        }

        assert_eq!(store.purge_all().unwrap(), 3);
        assert!(store.is_empty());
        assert!(store.pending().is_empty());
        assert_eq!(store.pending_count(), 0);
        assert_eq!(store.next_write_index(), 0);

        // Handles from before the purge stay dead.
        assert!(store.get(slots[0]).is_none());
        let fresh = store.admit(sample(9)).unwrap();
        assert_eq!(fresh.index(), 0);
        assert!(!store.mark_sent(slots[0]));
    }

    #[test]
    fn test_invalid_sample_rejected() {
        let mut store = OfflineStore::new(4).unwrap();
        let err = store.admit(Sample::new(f32::NAN, 45.0, 72, 1)).unwrap_err();
        assert!(matches!(err, Error::InvalidSample(_)));
        assert!(store.is_empty());
        assert_eq!(store.next_write_index(), 0);
    }

    #[test]
    fn test_restore_skips_invalid() {
        let mut store = OfflineStore::new(4).unwrap();
        let restored = store.restore(vec![
            sample(1),
            Sample::new(36.0, 45.0, 0, 2),
            sample(3),
        ]);
        assert_eq!(restored, 2);
        assert_eq!(pending_ts(&store), vec![1, 3]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn pending_never_exceeds_capacity_and_keeps_newest(
                capacity in 1usize..32,
                admissions in 0usize..100,
            ) {
                let mut store = OfflineStore::new(capacity).unwrap();
                for ts in 0..admissions as u64 {
                    store.admit(sample(ts)).unwrap();
                    prop_assert!(store.pending_count() <= capacity);
                }

                let expected: Vec<u64> =
                    (admissions.saturating_sub(capacity) as u64..admissions as u64).collect();
                prop_assert_eq!(pending_ts(&store), expected);
                prop_assert_eq!(
                    store.evicted_unsent(),
                    admissions.saturating_sub(capacity) as u64
                );
            }

            #[test]
            fn marking_sent_preserves_order_of_the_rest(
                admissions in 1usize..40,
                sent_mask in proptest::collection::vec(any::<bool>(), 40),
            ) {
                let mut store = OfflineStore::new(64).unwrap();
                let slots: Vec<_> = (0..admissions as u64)
                    .map(|ts| store.admit(sample(ts)).unwrap())
                    .collect();

                let mut expected = Vec::new();
                for (i, slot) in slots.iter().enumerate() {
                    if sent_mask[i] {
                        store.mark_sent(*slot);
                    } else {
                        expected.push(i as u64);
                    }
                }

                prop_assert_eq!(store.pending_count(), expected.len());
                prop_assert_eq!(pending_ts(&store), expected);
            }
        }
    }
}
