//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Broker bridge: turns the in-process event bus into a multi-process one. Publishes go out to a
// durable topic; a delivery loop reads the topic (including what this process just sent) and
// republishes into the local bus, so local subscribers are always fed the same way.
//
// | Component        | Description                                                   |
// |------------------|---------------------------------------------------------------|
// | TopicConnector   | Opens a publisher/consumer pair on a durable topic            |
// | TopicPublisher   | Non-blocking send side of a topic connection                  |
// | TopicConsumer    | Manual-ack receive side of a topic connection                 |
// | BrokerBridge     | EventHub backed by a topic connector                          |
// | EmbeddedTopic    | Connector for the in-process durable-log broker               |
// | AmqpTopic        | Connector for a RabbitMQ topic exchange                       |
// | RetryPolicy      | Bounded exponential backoff for (re)connecting                |
//--------------------------------------------------------------------------------------------------

mod amqp;
mod broker_bridge;
pub mod codec;
mod embedded;
mod retry;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::info;

use broker::{AmqpTopicConfig, BrokerError, EmbeddedBrokerConfig};

use crate::config::{BridgeMode, Config};
use crate::domain::services::events::{EventBus, EventHub};

pub use amqp::AmqpTopic;
pub use broker_bridge::BrokerBridge;
pub use embedded::EmbeddedTopic;
pub use retry::RetryPolicy;

/// Unacknowledged deliveries RabbitMQ may push to one instance at a time
const AMQP_PREFETCH: u16 = 64;

/// Errors raised by the broker bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The topic could not be reached
    #[error("Failed to connect to topic: {0}")]
    Connect(String),

    /// Every connection attempt failed
    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    /// A message could not be handed to the topic
    #[error("Failed to publish to topic: {0}")]
    Publish(String),

    /// A delivery could not be acknowledged
    #[error("Failed to acknowledge delivery {tag}: {reason}")]
    Ack { tag: u64, reason: String },

    /// An event could not be encoded or decoded
    #[error("Malformed event payload: {0}")]
    Codec(#[from] serde_json::Error),

    /// The bridge is closed or lost its topic connection for good
    #[error("Bridge is closed")]
    Closed,

    /// Error from the broker transport
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),
}

/// A message received from the topic
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Identifies the delivery when acknowledging it
    pub tag: u64,
    pub payload: Bytes,
    pub redelivered: bool,
}

/// Send side of a topic connection
#[async_trait]
pub trait TopicPublisher: Send + Sync {
    /// Queues a message for the topic without waiting on the network
    fn publish(&self, routing_key: &str, payload: Bytes) -> Result<(), BridgeError>;

    async fn close(&mut self);
}

/// Receive side of a topic connection
#[async_trait]
pub trait TopicConsumer: Send {
    /// Next delivery, `None` once the connection is gone
    async fn receive(&mut self) -> Option<Delivery>;

    async fn ack(&mut self, tag: u64) -> Result<(), BridgeError>;

    async fn close(&mut self);
}

/// Opens connections to one durable topic
#[async_trait]
pub trait TopicConnector: Send + Sync {
    /// Where the topic lives, for logs
    fn describe(&self) -> String;

    /// Connects and returns once the consumer is registered on the topic
    async fn connect(
        &self,
    ) -> Result<(Box<dyn TopicPublisher>, Box<dyn TopicConsumer>), BridgeError>;

    /// Releases resources owned by the connector itself, such as an embedded broker
    async fn shutdown(&self) {}
}

/// Stands in for the real publisher once the bridge is closed or has lost its topic
pub(crate) struct ClosedPublisher;

#[async_trait]
impl TopicPublisher for ClosedPublisher {
    fn publish(&self, _routing_key: &str, _payload: Bytes) -> Result<(), BridgeError> {
        Err(BridgeError::Closed)
    }

    async fn close(&mut self) {}
}

/// Builds the event hub selected by configuration.
///
/// For the bridged modes this returns only once the topic is connected and the delivery loop is
/// consuming, so nothing published afterwards can miss the local subscribers.
///
/// # Errors
/// Returns an error if the embedded broker cannot bind or the topic cannot be reached within the
/// configured connection attempts.
pub async fn connect_hub(config: &Config) -> Result<Arc<dyn EventHub>, BridgeError> {
    let bus = EventBus::new(config.queue_capacity);
    let retry = RetryPolicy::new(config.connect_attempts, config.connect_backoff);

    let connector: Arc<dyn TopicConnector> = match config.bridge_mode {
        BridgeMode::Local => {
            info!("Event bus running without a broker bridge");
            return Ok(Arc::new(bus));
        }
        BridgeMode::Embedded => Arc::new(
            EmbeddedTopic::start(
                &config.topic,
                config.retention,
                EmbeddedBrokerConfig::default(),
            )
            .await?,
        ),
        BridgeMode::Networked => {
            let url = config.rabbit_url.clone().ok_or_else(|| {
                BridgeError::Connect("networked mode needs a broker url".to_string())
            })?;
            Arc::new(AmqpTopic::new(AmqpTopicConfig {
                url,
                app_id: config.app_id.clone(),
                exchange: config.topic.clone(),
                consumer_name: config.consumer_name.clone(),
                message_ttl: Some(config.retention),
                prefetch: AMQP_PREFETCH,
            }))
        }
    };

    let bridge = BrokerBridge::start(connector, bus, retry).await?;
    Ok(Arc::new(bridge))
}
