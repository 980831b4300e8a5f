use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tracing::info;

use broker::{
    DeliverPolicy, EmbeddedBroker, EmbeddedBrokerConfig, EmbeddedClient, StreamPublisher,
    StreamSubscription,
};

use super::{BridgeError, Delivery, TopicConnector, TopicConsumer, TopicPublisher};

/// Connector for the in-process durable-log broker.
///
/// [`start`](Self::start) runs a broker on an ephemeral loopback port and owns it until
/// `shutdown`; [`attach`](Self::attach) connects to a broker some other process is running.
pub struct EmbeddedTopic {
    addr: SocketAddr,
    stream: String,
    retention: Duration,
    policy: DeliverPolicy,
    broker: Mutex<Option<EmbeddedBroker>>,
}

impl EmbeddedTopic {
    /// Starts an embedded broker that keeps `stream` for `retention`.
    ///
    /// # Errors
    /// Returns an error if the broker cannot bind its listening socket.
    pub async fn start(
        stream: &str,
        retention: Duration,
        config: EmbeddedBrokerConfig,
    ) -> Result<Self, BridgeError> {
        let broker = EmbeddedBroker::start(config).await?;
        let addr = broker.local_addr();
        info!("Embedded broker for stream {} on {}", stream, addr);

        Ok(Self {
            addr,
            stream: stream.to_string(),
            retention,
            policy: DeliverPolicy::New,
            broker: Mutex::new(Some(broker)),
        })
    }

    /// Uses a broker that is already running at `addr`
    pub fn attach(addr: SocketAddr, stream: &str, retention: Duration) -> Self {
        Self {
            addr,
            stream: stream.to_string(),
            retention,
            policy: DeliverPolicy::New,
            broker: Mutex::new(None),
        }
    }

    /// Where new subscriptions start reading; `New` unless changed
    pub fn with_policy(mut self, policy: DeliverPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }
}

#[async_trait]
impl TopicConnector for EmbeddedTopic {
    fn describe(&self) -> String {
        format!("embedded://{}/{}", self.addr, self.stream)
    }

    async fn connect(
        &self,
    ) -> Result<(Box<dyn TopicPublisher>, Box<dyn TopicConsumer>), BridgeError> {
        let client = EmbeddedClient::connect(self.addr).await?;
        client.create_stream(&self.stream, self.retention).await?;
        let subscription = client.subscribe(&self.stream, self.policy).await?;
        let publisher = client.publisher(&self.stream);

        Ok((
            Box::new(EmbeddedPublisher { inner: publisher }),
            Box::new(EmbeddedConsumer {
                client: Some(client),
                subscription,
            }),
        ))
    }

    async fn shutdown(&self) {
        let broker = self.broker.lock().take();
        if let Some(broker) = broker {
            broker.shutdown().await;
        }
    }
}

struct EmbeddedPublisher {
    inner: StreamPublisher,
}

#[async_trait]
impl TopicPublisher for EmbeddedPublisher {
    fn publish(&self, _routing_key: &str, payload: Bytes) -> Result<(), BridgeError> {
        self.inner
            .publish(payload)
            .map_err(|err| BridgeError::Publish(err.to_string()))
    }

    // The connection belongs to the consumer half
    async fn close(&mut self) {}
}

struct EmbeddedConsumer {
    client: Option<EmbeddedClient>,
    subscription: StreamSubscription,
}

#[async_trait]
impl TopicConsumer for EmbeddedConsumer {
    async fn receive(&mut self) -> Option<Delivery> {
        let message = self.subscription.receive().await?;
        Some(Delivery {
            tag: message.seq,
            payload: message.payload,
            redelivered: message.deliveries > 1,
        })
    }

    async fn ack(&mut self, tag: u64) -> Result<(), BridgeError> {
        self.subscription
            .ack(tag)
            .map_err(|err| BridgeError::Ack {
                tag,
                reason: err.to_string(),
            })
    }

    async fn close(&mut self) {
        if let Some(client) = self.client.take() {
            client.close().await;
        }
    }
}
