//! MQTT broker publisher built from the `[broker]` section.
//!
//! [`connect`] returns a [`MqttPublisher`] for the report pipeline and a
//! [`MqttConnection`] that must be driven on the runtime (`tokio::spawn(conn.run())`).
//! The connection task keeps reconnecting; while it is down every publish fails with
//! [`PublishError::NotConnected`] and the pipeline acknowledges `false`.
use super::publish::{PublishError, Publisher};
use crate::config::BrokerConfig;
use log::{debug, info, warn};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const KEEP_ALIVE: Duration = Duration::from_secs(30);
const RECONNECT_DELAY: Duration = Duration::from_secs(5);
/// Outgoing requests buffered between the pipeline and the connection task.
const REQUEST_CAPACITY: usize = 64;

pub struct MqttPublisher {
    client: AsyncClient,
    connected: Arc<AtomicBool>,
}

pub struct MqttConnection {
    eventloop: EventLoop,
    connected: Arc<AtomicBool>,
    broker: String,
}

pub fn mqtt_options(broker: &BrokerConfig) -> MqttOptions {
    let mut options = MqttOptions::new(broker.client_id.clone(), broker.host.clone(), broker.port);
    options.set_keep_alive(KEEP_ALIVE);
    if let Some(user) = broker.username.as_deref().filter(|u| !u.is_empty()) {
        options.set_credentials(user, broker.password.clone().unwrap_or_default());
    }
    options
}

pub fn connect(broker: &BrokerConfig) -> (MqttPublisher, MqttConnection) {
    let (client, eventloop) = AsyncClient::new(mqtt_options(broker), REQUEST_CAPACITY);
    let connected = Arc::new(AtomicBool::new(false));
    (
        MqttPublisher {
            client,
            connected: connected.clone(),
        },
        MqttConnection {
            eventloop,
            connected,
            broker: format!("{}:{}", broker.host, broker.port),
        },
    )
}

impl MqttPublisher {
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Wait up to `timeout` for the first broker acknowledgment.
    pub async fn wait_connected(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while !self.is_connected() {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        true
    }
}

impl Publisher for MqttPublisher {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), PublishError> {
        if !self.is_connected() {
            return Err(PublishError::NotConnected);
        }
        self.client
            .try_publish(topic, QoS::AtLeastOnce, retain, payload.as_bytes().to_vec())
            .map_err(|e| PublishError::Rejected {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }
}

impl MqttConnection {
    /// Drive the client until the process exits, reconnecting after failures.
    pub async fn run(mut self) {
        info!("Connecting to MQTT broker {}", self.broker);
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    info!("Connected to MQTT broker {} ({:?})", self.broker, ack.code);
                    self.connected.store(true, Ordering::Relaxed);
                }
                Ok(event) => debug!("MQTT event: {:?}", event),
                Err(e) => {
                    if self.connected.swap(false, Ordering::Relaxed) {
                        warn!("Lost MQTT broker {}: {}", self.broker, e);
                    } else {
                        debug!("MQTT broker {} unavailable: {}", self.broker, e);
                    }
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }
}
