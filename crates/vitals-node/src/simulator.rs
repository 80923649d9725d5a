//! Simulated sensors and network for running the node without hardware.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use vitals_core::{HeartRateWalk, Millis, Sample, SampleSource};

use crate::config::{NetworkConfig, NetworkMode, SamplingConfig};

/// Largest drift per reading, in °C.
const TEMPERATURE_STEP: f32 = 0.15;
/// Largest drift per reading, in %.
const HUMIDITY_STEP: f32 = 1.5;
/// How far the temperature may wander from its baseline, in °C.
const TEMPERATURE_SPAN: f32 = 2.0;
/// How far the humidity may wander from its baseline, in %.
const HUMIDITY_SPAN: f32 = 15.0;

/// Temperature, humidity and heart-rate generator.
///
/// Temperature and humidity drift around their baselines; heart rate
/// follows a [`HeartRateWalk`] refreshed on its own, slower cadence. With a
/// non-zero fault probability some acquisitions fail the way a DHT sensor
/// does, by returning no reading.
#[derive(Debug)]
pub struct SimulatedSensor {
    rng: StdRng,
    heart: HeartRateWalk<StdRng>,
    temperature: f32,
    humidity: f32,
    baseline_temperature: f32,
    baseline_humidity: f32,
    fault_probability: f64,
    heart_rate_interval: Millis,
    last_heart_update: Option<Millis>,
}

impl SimulatedSensor {
    pub fn new(config: &SamplingConfig) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        debug!("Sensor simulation seed {}", seed);

        let mut rng = StdRng::seed_from_u64(seed);
        let heart = HeartRateWalk::new(StdRng::seed_from_u64(rng.random()));

        Self {
            rng,
            heart,
            temperature: config.baseline_temperature,
            humidity: config.baseline_humidity,
            baseline_temperature: config.baseline_temperature,
            baseline_humidity: config.baseline_humidity,
            fault_probability: config.fault_probability.clamp(0.0, 1.0),
            heart_rate_interval: config.heart_rate_interval_ms,
            last_heart_update: None,
        }
    }

    fn drift(&mut self) {
        let dt = self.rng.random_range(-TEMPERATURE_STEP..=TEMPERATURE_STEP);
        self.temperature = (self.temperature + dt).clamp(
            self.baseline_temperature - TEMPERATURE_SPAN,
            self.baseline_temperature + TEMPERATURE_SPAN,
        );

        let dh = self.rng.random_range(-HUMIDITY_STEP..=HUMIDITY_STEP);
        self.humidity = (self.humidity + dh)
            .clamp(
                self.baseline_humidity - HUMIDITY_SPAN,
                self.baseline_humidity + HUMIDITY_SPAN,
            )
            .clamp(0.0, 100.0);
    }

    fn heart_rate(&mut self, now: Millis) -> u16 {
        let due = self
            .last_heart_update
            .is_none_or(|last| now.saturating_sub(last) >= self.heart_rate_interval);
        if due {
            self.last_heart_update = Some(now);
            self.heart.step()
        } else {
            self.heart.current()
        }
    }
}

impl SampleSource for SimulatedSensor {
    fn acquire(&mut self, now: Millis) -> Option<Sample> {
        self.drift();
        let heart_rate = self.heart_rate(now);

        if self.rng.random_bool(self.fault_probability) {
            debug!("Simulated sensor fault at {}ms", now);
            return None;
        }

        Some(Sample::new(self.temperature, self.humidity, heart_rate, now))
    }
}

/// Network availability signal.
#[derive(Debug, Clone)]
pub struct SimulatedNetwork {
    mode: NetworkMode,
    toggle_interval: Millis,
}

impl SimulatedNetwork {
    pub fn new(config: &NetworkConfig) -> Self {
        Self {
            mode: config.mode,
            toggle_interval: config.toggle_interval_ms.max(1),
        }
    }

    /// Whether the network is up at `now`. In toggle mode the network
    /// starts up and flips every interval.
    pub fn is_up(&self, now: Millis) -> bool {
        match self.mode {
            NetworkMode::AlwaysUp => true,
            NetworkMode::Toggle => (now / self.toggle_interval) % 2 == 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sampling(seed: u64) -> SamplingConfig {
        SamplingConfig {
            seed: Some(seed),
            ..Default::default()
        }
    }

    #[test]
    fn test_same_seed_same_readings() {
        let mut a = SimulatedSensor::new(&sampling(11));
        let mut b = SimulatedSensor::new(&sampling(11));
        for i in 0..20 {
            assert_eq!(a.acquire(i * 5_000), b.acquire(i * 5_000));
        }
    }

    #[test]
    fn test_readings_are_valid() {
        let mut sensor = SimulatedSensor::new(&sampling(5));
        for i in 0..500 {
            let sample = sensor.acquire(i * 5_000).unwrap();
            assert!(sample.is_valid(), "{} is not valid", sample);
            assert_eq!(sample.captured_at, i * 5_000);
        }
    }

    #[test]
    fn test_heart_rate_held_between_updates() {
        let mut sensor = SimulatedSensor::new(&sampling(3));
        let first = sensor.acquire(0).unwrap().heart_rate;
        let second = sensor.acquire(5_000).unwrap().heart_rate;
        assert_eq!(first, second);
    }

    #[test]
    fn test_fault_probability_one_always_fails() {
        let config = SamplingConfig {
            seed: Some(1),
            fault_probability: 1.0,
            ..Default::default()
        };
        let mut sensor = SimulatedSensor::new(&config);
        assert!((0..10).all(|i| sensor.acquire(i).is_none()));
    }

    #[test]
    fn test_always_up_network() {
        let network = SimulatedNetwork::new(&NetworkConfig::default());
        assert!(network.is_up(0));
        assert!(network.is_up(1_000_000));
    }

    #[test]
    fn test_toggle_network() {
        let network = SimulatedNetwork::new(&NetworkConfig {
            mode: NetworkMode::Toggle,
            toggle_interval_ms: 45_000,
        });
        assert!(network.is_up(0));
        assert!(network.is_up(44_999));
        assert!(!network.is_up(45_000));
        assert!(!network.is_up(89_999));
        assert!(network.is_up(90_000));
    }
}
