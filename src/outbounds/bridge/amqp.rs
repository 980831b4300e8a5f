use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, warn};
use uuid::Uuid;

use broker::{AmqpTopicConfig, Message, PublisherContext, TopicSubscription, open_topic};

use super::{BridgeError, Delivery, TopicConnector, TopicConsumer, TopicPublisher};

/// Connector for a durable RabbitMQ topic exchange.
///
/// Every event is published with its kind as routing key; each instance binds its queue with
/// `#` and so receives every kind, its own publishes included.
pub struct AmqpTopic {
    config: AmqpTopicConfig,
}

impl AmqpTopic {
    pub fn new(config: AmqpTopicConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TopicConnector for AmqpTopic {
    fn describe(&self) -> String {
        // Credentials stay out of the logs
        let host = self
            .config
            .url
            .rsplit_once('@')
            .map_or(self.config.url.as_str(), |(_, host)| host);
        format!("amqp://{}/{}", host.trim_start_matches("amqp://"), self.config.exchange)
    }

    async fn connect(
        &self,
    ) -> Result<(Box<dyn TopicPublisher>, Box<dyn TopicConsumer>), BridgeError> {
        let (publisher, subscription) = open_topic(&self.config).await?;
        Ok((
            Box::new(AmqpPublisher {
                inner: Some(publisher),
            }),
            Box::new(AmqpConsumer {
                inner: Some(subscription),
            }),
        ))
    }
}

struct AmqpPublisher {
    inner: Option<broker::TopicPublisher>,
}

#[async_trait]
impl TopicPublisher for AmqpPublisher {
    fn publish(&self, routing_key: &str, payload: Bytes) -> Result<(), BridgeError> {
        let publisher = self.inner.as_ref().ok_or(BridgeError::Closed)?;
        let message_id = Uuid::new_v4().to_string();
        publisher.publish(
            Message::new(payload.to_vec(), None).with_topic(routing_key),
            PublisherContext::new(&message_id, Some(message_id.clone())),
        )?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(publisher) = self.inner.take() {
            if let Err(err) = publisher.close().await {
                warn!("Closing topic publisher failed: {}", err);
            }
        }
    }
}

struct AmqpConsumer {
    inner: Option<TopicSubscription>,
}

#[async_trait]
impl TopicConsumer for AmqpConsumer {
    async fn receive(&mut self) -> Option<Delivery> {
        let subscription = self.inner.as_mut()?;
        loop {
            let message = subscription.receive().await?;
            match message.deliver {
                Some(deliver) => {
                    return Some(Delivery {
                        tag: deliver.delivery_tag(),
                        payload: Bytes::from(message.content.unwrap_or_default()),
                        redelivered: deliver.redelivered(),
                    });
                }
                None => debug!("Skipping message without delivery information"),
            }
        }
    }

    async fn ack(&mut self, tag: u64) -> Result<(), BridgeError> {
        let subscription = self.inner.as_ref().ok_or(BridgeError::Closed)?;
        subscription
            .ack_tag(tag)
            .await
            .map_err(|err| BridgeError::Ack {
                tag,
                reason: err.to_string(),
            })
    }

    async fn close(&mut self) {
        if let Some(subscription) = self.inner.take() {
            if let Err(err) = subscription.close().await {
                warn!("Closing topic subscription failed: {}", err);
            }
        }
    }
}
