//! MQTT transport for the telemetry node.
//!
//! [`MqttPublisher`] implements the core's synchronous [`Publisher`] on top
//! of `rumqttc`. Publishing only enqueues into the client's request
//! channel and never blocks; the event loop runs in its own task and keeps
//! the shared session flag up to date.
//!
//! # Example Configuration
//!
//! ```toml
//! [mqtt]
//! broker = "mqtt://localhost:1883"
//! topic_prefix = "telemetry"
//! qos = 1
//! retain = false
//! ```
//!
//! # Reconnection
//!
//! A connection attempt spawns the event loop and returns
//! [`Error::ConnectPending`]. The session counts as connected once the
//! broker acknowledges it. When the connection drops, the event loop keeps
//! retrying on its own while the node keeps buffering.
//!
//! # Disconnecting
//!
//! A message accepted by [`Publisher::publish`] may still sit in the request
//! queue. Disconnecting therefore never aborts the event loop: it queues a
//! DISCONNECT behind the pending requests and lets the loop flush them. The
//! loop exits once the DISCONNECT is written or the connection fails.
//! [`DrainHandle::wait`] lets the caller block on that before the runtime
//! goes away.
//!
//! # Presence
//!
//! Publishes on the last-will topic are always retained, like the will
//! itself, so a late subscriber sees the current presence rather than a
//! stale offline will.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rumqttc::{AsyncClient, ConnectReturnCode, Event, LastWill, MqttOptions, Outgoing, Packet, QoS};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use vitals_core::{Error, Message, Publisher, Result};

use crate::config::MqttConfig;

/// Delay before the event loop is polled again after an error.
const RETRY_DELAY: Duration = Duration::from_secs(5);

struct Session {
    client: AsyncClient,
    connected: Arc<AtomicBool>,
    closing: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

/// Event loops that are flushing their queue after a disconnect.
#[derive(Debug, Clone, Default)]
pub struct DrainHandle {
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl DrainHandle {
    fn push(&self, task: JoinHandle<()>) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.retain(|t| !t.is_finished());
        tasks.push(task);
    }

    /// Number of event loops still flushing.
    pub fn in_flight(&self) -> usize {
        let tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.iter().filter(|t| !t.is_finished()).count()
    }

    /// Wait for closing sessions to finish flushing. A loop still running
    /// after `limit` is aborted. Returns `true` when every loop finished
    /// on its own.
    pub async fn wait(&self, limit: Duration) -> bool {
        let tasks = {
            let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *tasks)
        };

        let deadline = tokio::time::Instant::now() + limit;
        let mut clean = true;
        for mut task in tasks {
            if tokio::time::timeout_at(deadline, &mut task).await.is_err() {
                warn!("MQTT session did not flush in time, dropping queued messages");
                task.abort();
                clean = false;
            }
        }
        clean
    }
}

/// Broker session backed by `rumqttc`.
pub struct MqttPublisher {
    host: String,
    port: u16,
    config: MqttConfig,
    qos: QoS,
    last_will: Option<Message>,
    session: Option<Session>,
    drain: DrainHandle,
}

impl std::fmt::Debug for MqttPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttPublisher")
            .field("broker", &self.config.broker)
            .field("session", &self.session.is_some())
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl MqttPublisher {
    /// Create a publisher for the configured broker. Nothing connects yet.
    pub fn new(config: MqttConfig) -> Result<Self> {
        let (host, port) = parse_broker_url(&config.broker).map_err(Error::InvalidConfig)?;
        Ok(Self {
            host,
            port,
            qos: qos_from_level(config.qos),
            config,
            last_will: None,
            session: None,
            drain: DrainHandle::default(),
        })
    }

    /// Message the broker publishes on our behalf if the session dies.
    pub fn with_last_will(mut self, message: Message) -> Self {
        self.last_will = Some(message);
        self
    }

    /// Handle for waiting on sessions that are still flushing after a
    /// disconnect. Take it before handing the publisher to the node.
    pub fn drain_handle(&self) -> DrainHandle {
        self.drain.clone()
    }

    /// Retain flag used for a publish on `topic`.
    pub fn retain_for(&self, topic: &str) -> bool {
        let presence = self.last_will.as_ref().is_some_and(|w| w.topic == topic);
        presence || self.config.retain
    }

    fn options(&self, client_id: &str) -> MqttOptions {
        let mut options = MqttOptions::new(client_id, self.host.clone(), self.port);
        options.set_keep_alive(Duration::from_secs(self.config.keep_alive));

        if let (Some(username), Some(password)) = (&self.config.username, &self.config.password) {
            options.set_credentials(username, password);
        }
        if let Some(will) = &self.last_will {
            options.set_last_will(LastWill::new(
                will.topic.clone(),
                will.payload.clone(),
                self.qos,
                self.retain_for(&will.topic),
            ));
        }
        options
    }

    /// Close the session without discarding queued requests.
    fn teardown(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        session.connected.store(false, Ordering::SeqCst);
        session.closing.store(true, Ordering::SeqCst);
        if let Err(e) = session.client.try_disconnect() {
            // Queue is full: wait for room instead of dropping the backlog.
            debug!("MQTT request queue full, deferring disconnect: {}", e);
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    let client = session.client.clone();
                    runtime.spawn(async move {
                        if let Err(e) = client.disconnect().await {
                            debug!("Error disconnecting MQTT client: {}", e);
                        }
                    });
                }
                Err(_) => session.task.abort(),
            }
        }
        self.drain.push(session.task);
    }
}

impl Publisher for MqttPublisher {
    fn connect(&mut self, client_id: &str) -> Result<()> {
        if let Some(session) = &self.session {
            return if session.connected.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(Error::ConnectPending)
            };
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Transport(format!("no async runtime: {}", e)))?;

        let (client, eventloop) =
            AsyncClient::new(self.options(client_id), self.config.queue_capacity);
        let connected = Arc::new(AtomicBool::new(false));
        let closing = Arc::new(AtomicBool::new(false));
        let task = runtime.spawn(drive_event_loop(
            eventloop,
            Arc::clone(&connected),
            Arc::clone(&closing),
        ));

        info!(
            "Connecting to MQTT broker {}:{} as {}",
            self.host, self.port, client_id
        );
        self.session = Some(Session {
            client,
            connected,
            closing,
            task,
        });
        Err(Error::ConnectPending)
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
        let session = self
            .session
            .as_ref()
            .filter(|s| s.connected.load(Ordering::SeqCst))
            .ok_or(Error::NotConnected)?;

        session
            .client
            .try_publish(topic, self.qos, self.retain_for(topic), payload.to_vec())
            .map_err(|e| Error::Publish {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }

    fn disconnect(&mut self) -> Result<()> {
        self.teardown();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.connected.load(Ordering::SeqCst))
    }
}

impl Drop for MqttPublisher {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Poll the event loop, mirroring the session state into `connected`.
///
/// Runs until the DISCONNECT queued by a teardown has been written, or until
/// the connection fails once `closing` is set.
async fn drive_event_loop(
    mut eventloop: rumqttc::EventLoop,
    connected: Arc<AtomicBool>,
    closing: Arc<AtomicBool>,
) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("MQTT session closed");
                break;
            }
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    info!("MQTT connected");
                    connected.store(true, Ordering::SeqCst);
                } else {
                    warn!("MQTT broker refused connection: {:?}", ack.code);
                    connected.store(false, Ordering::SeqCst);
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                warn!("MQTT broker closed the session");
                connected.store(false, Ordering::SeqCst);
            }
            Ok(Event::Incoming(Packet::PingResp)) => {
                debug!("MQTT ping response received");
            }
            Ok(_) => {}
            Err(e) if closing.load(Ordering::SeqCst) => {
                debug!("MQTT connection error while closing: {}", e);
                break;
            }
            Err(e) => {
                if connected.swap(false, Ordering::SeqCst) {
                    warn!("MQTT connection lost: {}. Reconnecting...", e);
                } else {
                    debug!("MQTT connection error: {}", e);
                }
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }
}

fn qos_from_level(level: u8) -> QoS {
    match level {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        _ => QoS::ExactlyOnce,
    }
}

/// Parse an MQTT broker URL into (host, port).
pub fn parse_broker_url(url: &str) -> std::result::Result<(String, u16), String> {
    let Some(rest) = url.strip_prefix("mqtt://") else {
        return Err("Invalid scheme: URL must start with mqtt://".to_string());
    };

    let (host, port) = if let Some((h, p)) = rest.rsplit_once(':') {
        let port = p
            .parse::<u16>()
            .map_err(|_| format!("Invalid port: {}", p))?;
        (h.to_string(), port)
    } else {
        (rest.to_string(), 1883)
    };

    if host.is_empty() {
        return Err("Host cannot be empty".to_string());
    }
    if port == 0 {
        return Err("Port cannot be 0".to_string());
    }

    Ok((host, port))
}
