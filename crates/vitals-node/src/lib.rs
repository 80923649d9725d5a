//! Wearable vitals telemetry node.
//!
//! This crate wires the offline-first core to the outside world:
//! - Loads configuration from TOML with field-level validation
//! - Publishes to an MQTT broker through `rumqttc`
//! - Simulates the sensors and, optionally, an intermittent network
//! - Drives the node from a `tokio` tick loop
//!
//! # Configuration
//!
//! The node reads configuration from `~/.config/vitals/node.toml`:
//!
//! ```toml
//! [device]
//! id = "wearable-001"
//!
//! [mqtt]
//! broker = "mqtt://localhost:1883"
//! topic_prefix = "telemetry"
//!
//! [storage]
//! journal_path = "~/.local/share/vitals/sensor_data.jsonl"
//! capacity = 1000
//!
//! [sync]
//! pacing_interval_ms = 2000
//! reconnect_interval_ms = 5000
//!
//! [network]
//! mode = "toggle"
//! toggle_interval_ms = 45000
//!
//! [alerts]
//! temperature_critical = 38.0
//! heart_rate_critical = 120
//! ```

pub mod config;
pub mod mqtt;
pub mod runner;
pub mod simulator;

pub use config::{
    Config, ConfigError, DeviceConfig, MqttConfig, NetworkConfig, NetworkMode, SamplingConfig,
    StorageConfig, SyncConfig, ValidationError,
};
pub use mqtt::{DrainHandle, MqttPublisher};
pub use runner::{Runner, open_journal};
pub use simulator::{SimulatedNetwork, SimulatedSensor};
