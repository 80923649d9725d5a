//! Node configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use vitals_core::{AlertThresholds, NodeOptions};
use vitals_store::DEFAULT_CAPACITY;

/// Node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Device identity.
    pub device: DeviceConfig,
    /// Broker settings.
    pub mqtt: MqttConfig,
    /// Offline buffer and journal settings.
    pub storage: StorageConfig,
    /// Sync pacing.
    pub sync: SyncConfig,
    /// Sensor simulation.
    pub sampling: SamplingConfig,
    /// Network simulation.
    pub network: NetworkConfig,
    /// Alert bounds.
    pub alerts: AlertThresholds,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return every problem found.
    ///
    /// # Example
    ///
    /// ```
    /// use vitals_node::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        errors.extend(self.device.validate());
        errors.extend(self.mqtt.validate());
        errors.extend(self.storage.validate());
        errors.extend(self.sync.validate());
        errors.extend(self.sampling.validate());
        errors.extend(self.network.validate());

        if let Err(e) = self.alerts.validate() {
            errors.push(ValidationError {
                field: "alerts".to_string(),
                message: e.to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Options for building the telemetry node.
    pub fn node_options(&self) -> NodeOptions {
        NodeOptions::new(self.device.id.clone())
            .topic_prefix(self.mqtt.topic_prefix.clone())
            .capacity(self.storage.capacity)
            .pacing_interval(Duration::from_millis(self.sync.pacing_interval_ms))
            .reconnect_interval(Duration::from_millis(self.sync.reconnect_interval_ms))
            .thresholds(self.alerts)
    }
}

/// Device identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Broker client id and `device_id` in payloads.
    pub id: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            id: "wearable-001".to_string(),
        }
    }
}

impl DeviceConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.id.trim().is_empty() {
            errors.push(ValidationError {
                field: "device.id".to_string(),
                message: "device id cannot be empty".to_string(),
            });
        } else if self.id.len() > 23 {
            // MQTT 3.1.1 brokers are only required to accept 23-byte client ids.
            errors.push(ValidationError {
                field: "device.id".to_string(),
                message: format!(
                    "device id '{}' is longer than 23 characters",
                    self.id
                ),
            });
        }
        errors
    }
}

/// Broker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker URL (`mqtt://host:port`).
    pub broker: String,
    /// Topic prefix for all channels.
    pub topic_prefix: String,
    /// QoS level (0, 1 or 2).
    pub qos: u8,
    /// Retain published messages.
    pub retain: bool,
    /// Keep-alive interval in seconds.
    pub keep_alive: u64,
    /// Outgoing request queue size.
    pub queue_capacity: usize,
    /// Username for broker authentication.
    pub username: Option<String>,
    /// Password for broker authentication.
    pub password: Option<String>,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker: "mqtt://localhost:1883".to_string(),
            topic_prefix: vitals_core::DEFAULT_TOPIC_PREFIX.to_string(),
            qos: 1,
            retain: false,
            keep_alive: 30,
            queue_capacity: 100,
            username: None,
            password: None,
        }
    }
}

impl MqttConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if let Err(message) = crate::mqtt::parse_broker_url(&self.broker) {
            errors.push(ValidationError {
                field: "mqtt.broker".to_string(),
                message,
            });
        }

        if self.topic_prefix.contains(['#', '+']) {
            errors.push(ValidationError {
                field: "mqtt.topic_prefix".to_string(),
                message: format!(
                    "topic prefix '{}' cannot contain wildcards",
                    self.topic_prefix
                ),
            });
        }

        if self.qos > 2 {
            errors.push(ValidationError {
                field: "mqtt.qos".to_string(),
                message: format!("invalid QoS {}: must be 0, 1 or 2", self.qos),
            });
        }

        if self.keep_alive < 5 {
            errors.push(ValidationError {
                field: "mqtt.keep_alive".to_string(),
                message: format!(
                    "keep-alive {} is too short (minimum 5 seconds)",
                    self.keep_alive
                ),
            });
        }

        if self.queue_capacity == 0 {
            errors.push(ValidationError {
                field: "mqtt.queue_capacity".to_string(),
                message: "queue capacity must be at least 1".to_string(),
            });
        }

        if self.username.is_some() != self.password.is_some() {
            errors.push(ValidationError {
                field: "mqtt.username".to_string(),
                message: "username and password must be set together".to_string(),
            });
        }

        errors
    }
}

/// Offline buffer and journal settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Journal file path.
    pub journal_path: PathBuf,
    /// Maximum number of buffered samples.
    pub capacity: usize,
    /// Skip the journal entirely.
    pub memory_only: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            journal_path: vitals_store::default_journal_path(),
            capacity: DEFAULT_CAPACITY,
            memory_only: false,
        }
    }
}

/// Largest accepted buffer size.
pub const MAX_CAPACITY: usize = 100_000;

impl StorageConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if !self.memory_only && self.journal_path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.journal_path".to_string(),
                message: "journal path cannot be empty".to_string(),
            });
        }

        if self.capacity == 0 || self.capacity > MAX_CAPACITY {
            errors.push(ValidationError {
                field: "storage.capacity".to_string(),
                message: format!(
                    "capacity {} is out of range (1-{})",
                    self.capacity, MAX_CAPACITY
                ),
            });
        }

        errors
    }
}

/// Sync pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Minimum gap between publish attempts in milliseconds.
    pub pacing_interval_ms: u64,
    /// Minimum gap between broker connection attempts in milliseconds.
    pub reconnect_interval_ms: u64,
    /// Scheduler tick period in milliseconds.
    pub tick_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            pacing_interval_ms: 2_000,
            reconnect_interval_ms: 5_000,
            tick_interval_ms: 500,
        }
    }
}

impl SyncConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.tick_interval_ms == 0 {
            errors.push(ValidationError {
                field: "sync.tick_interval_ms".to_string(),
                message: "tick interval must be at least 1 ms".to_string(),
            });
        }

        if self.pacing_interval_ms < self.tick_interval_ms {
            errors.push(ValidationError {
                field: "sync.pacing_interval_ms".to_string(),
                message: format!(
                    "pacing interval {} ms is shorter than the tick interval {} ms",
                    self.pacing_interval_ms, self.tick_interval_ms
                ),
            });
        }

        if self.reconnect_interval_ms < 1_000 {
            errors.push(ValidationError {
                field: "sync.reconnect_interval_ms".to_string(),
                message: format!(
                    "reconnect interval {} ms is too short (minimum 1000 ms)",
                    self.reconnect_interval_ms
                ),
            });
        }

        errors
    }
}

/// Sensor simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Time between acquisitions in milliseconds.
    pub interval_ms: u64,
    /// Time between heart-rate updates in milliseconds.
    pub heart_rate_interval_ms: u64,
    /// Seed for reproducible runs; random when unset.
    pub seed: Option<u64>,
    /// Probability that an acquisition fails.
    pub fault_probability: f64,
    /// Temperature the simulation wanders around, in °C.
    pub baseline_temperature: f32,
    /// Humidity the simulation wanders around, in %.
    pub baseline_humidity: f32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5_000,
            heart_rate_interval_ms: 10_000,
            seed: None,
            fault_probability: 0.0,
            baseline_temperature: 36.6,
            baseline_humidity: 50.0,
        }
    }
}

impl SamplingConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.interval_ms < 100 {
            errors.push(ValidationError {
                field: "sampling.interval_ms".to_string(),
                message: format!(
                    "sampling interval {} ms is too short (minimum 100 ms)",
                    self.interval_ms
                ),
            });
        }

        if !(0.0..=1.0).contains(&self.fault_probability) {
            errors.push(ValidationError {
                field: "sampling.fault_probability".to_string(),
                message: format!(
                    "fault probability {} must be between 0 and 1",
                    self.fault_probability
                ),
            });
        }

        if !(0.0..=100.0).contains(&self.baseline_humidity) {
            errors.push(ValidationError {
                field: "sampling.baseline_humidity".to_string(),
                message: format!(
                    "baseline humidity {} must be between 0 and 100",
                    self.baseline_humidity
                ),
            });
        }

        errors
    }
}

/// How the simulated network behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkMode {
    /// Network always reported up.
    #[default]
    AlwaysUp,
    /// Alternate between up and down every `toggle_interval_ms`.
    Toggle,
}

/// Network simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub mode: NetworkMode,
    /// Half-period of the toggle in milliseconds.
    pub toggle_interval_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mode: NetworkMode::AlwaysUp,
            toggle_interval_ms: 45_000,
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.mode == NetworkMode::Toggle && self.toggle_interval_ms < 1_000 {
            errors.push(ValidationError {
                field: "network.toggle_interval_ms".to_string(),
                message: format!(
                    "toggle interval {} ms is too short (minimum 1000 ms)",
                    self.toggle_interval_ms
                ),
            });
        }
        errors
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `mqtt.broker`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vitals")
        .join("node.toml")
}
