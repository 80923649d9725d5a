//! Synthetic heart-rate generator.
//!
//! Produces a plausible resting rhythm with occasional exertion spikes.
//! Consecutive values never jump by more than [`MAX_STEP`] bpm before
//! smoothing is applied; a larger jump is replaced by the midpoint.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Resting band in bpm, inclusive.
pub const RESTING_BAND: (u16, u16) = (68, 75);
/// Spike band in bpm, inclusive.
pub const SPIKE_BAND: (u16, u16) = (100, 115);
/// Probability that a step draws from the spike band.
pub const SPIKE_PROBABILITY: f64 = 0.05;
/// Largest jump accepted without smoothing.
pub const MAX_STEP: u16 = 5;
/// Value the walk starts from.
pub const INITIAL_BPM: u16 = 70;

/// Smoothed random walk over heart-rate bands.
///
/// # Example
///
/// ```
/// use vitals_core::HeartRateWalk;
///
/// let mut walk = HeartRateWalk::seeded(7);
/// for _ in 0..100 {
///     let bpm = walk.step();
///     assert!((68..=115).contains(&bpm));
/// }
/// ```
#[derive(Debug, Clone)]
pub struct HeartRateWalk<R> {
    rng: R,
    current: u16,
}

impl HeartRateWalk<StdRng> {
    /// Deterministic walk for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> HeartRateWalk<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            current: INITIAL_BPM,
        }
    }

    /// Last value produced.
    pub fn current(&self) -> u16 {
        self.current
    }

    /// Advance one step.
    pub fn step(&mut self) -> u16 {
        let (low, high) = if self.rng.random_bool(SPIKE_PROBABILITY) {
            SPIKE_BAND
        } else {
            RESTING_BAND
        };

        let mut next = self.rng.random_range(low..=high);
        if next.abs_diff(self.current) > MAX_STEP {
            next = (next + self.current) / 2;
        }

        self.current = next;
        next
    }
}
