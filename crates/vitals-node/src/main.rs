//! Vitals node - offline-first wearable telemetry.
//!
//! Run with: `cargo run -p vitals-node`

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use vitals_core::{Channels, TelemetryNode};
use vitals_node::{
    Config, MqttPublisher, NetworkMode, Runner, SimulatedNetwork, SimulatedSensor, open_journal,
};

/// How long queued messages get to reach the broker on exit.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Vitals node - buffers readings offline and syncs them over MQTT.
#[derive(Parser, Debug)]
#[command(name = "vitals-node")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Journal path (overrides config).
    #[arg(short, long)]
    journal: Option<PathBuf>,

    /// Broker URL, e.g. mqtt://localhost:1883 (overrides config).
    #[arg(short, long)]
    broker: Option<String>,

    /// Seed for the sensor simulation.
    #[arg(long)]
    seed: Option<u64>,

    /// Keep buffered samples in memory only.
    #[arg(long)]
    memory_only: bool,

    /// Toggle the simulated network up and down.
    #[arg(long)]
    flaky_network: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vitals_node=info".parse()?)
                .add_directive("vitals_core=info".parse()?)
                .add_directive("vitals_store=info".parse()?),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    if let Some(journal) = args.journal {
        config.storage.journal_path = journal;
    }
    if let Some(broker) = args.broker {
        config.mqtt.broker = broker;
    }
    if args.seed.is_some() {
        config.sampling.seed = args.seed;
    }
    if args.memory_only {
        config.storage.memory_only = true;
    }
    if args.flaky_network {
        config.network.mode = NetworkMode::Toggle;
    }

    config.validate()?;

    let channels = Channels::new(config.device.id.clone(), &config.mqtt.topic_prefix);
    let publisher =
        MqttPublisher::new(config.mqtt.clone())?.with_last_will(channels.status_message(false)?);

    info!("Broker {} with prefix '{}'", config.mqtt.broker, channels.prefix());
    let drain = publisher.drain_handle();

    let journal = open_journal(&config.storage);
    let node = TelemetryNode::boot(config.node_options(), journal, publisher)?;

    let runner = Runner::new(
        &config,
        node,
        SimulatedSensor::new(&config.sampling),
        SimulatedNetwork::new(&config.network),
    );

    let status = runner
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    if !drain.wait(FLUSH_TIMEOUT).await {
        tracing::warn!("Broker session closed before the queue was flushed");
    }

    info!(
        "Stopped: {} sent, {} pending, {} evicted",
        status.sync.sent, status.pending, status.evicted_unsent
    );

    Ok(())
}
