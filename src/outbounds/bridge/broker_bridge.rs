//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name           | Description                                          | Key Methods          |
// |----------------|------------------------------------------------------|----------------------|
// | BrokerBridge   | EventHub that routes every publish through a topic   | start, publish,      |
// |                |                                                      | close                |
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{
    BridgeError, ClosedPublisher, Delivery, RetryPolicy, TopicConnector, TopicConsumer,
    TopicPublisher, codec,
};
use crate::domain::services::events::{
    DraftEvent, EventBus, EventError, EventHub, EventResult, Subscription,
};

struct BridgeShared {
    connector: Arc<dyn TopicConnector>,
    publisher: RwLock<Box<dyn TopicPublisher>>,
    accepting: AtomicBool,
    retry: RetryPolicy,
}

impl BridgeShared {
    /// Puts `next` in place of the current publisher and closes the old one.
    async fn swap_publisher(&self, next: Box<dyn TopicPublisher>) {
        let mut previous = std::mem::replace(&mut *self.publisher.write(), next);
        previous.close().await;
    }

    /// Installs a reconnected publisher unless the bridge is closing, in which case the new
    /// publisher is closed instead.
    async fn install_publisher(&self, next: Box<dyn TopicPublisher>) -> bool {
        let swapped = {
            let mut current = self.publisher.write();
            if self.accepting.load(Ordering::SeqCst) {
                Ok(std::mem::replace(&mut *current, next))
            } else {
                Err(next)
            }
        };
        match swapped {
            Ok(mut previous) => {
                previous.close().await;
                true
            }
            Err(mut rejected) => {
                rejected.close().await;
                false
            }
        }
    }
}

/// Event hub whose publishes travel through a durable topic.
///
/// `publish` serializes the event and hands it to the topic publisher without waiting. A
/// delivery loop reads the topic and republishes every message into the local [`EventBus`],
/// acknowledging it afterwards. Local subscribers therefore see events from this process and
/// from every peer on the same topic through one path.
///
/// `close()` MUST be called for a graceful shutdown.
pub struct BrokerBridge {
    bus: EventBus,
    shared: Arc<BridgeShared>,
    cancel: CancellationToken,
    delivery: Mutex<Option<JoinHandle<()>>>,
}

impl BrokerBridge {
    /// Connects to the topic and starts the delivery loop.
    ///
    /// Returns once the consumer is registered, so events published after this call are not
    /// lost for local subscribers.
    ///
    /// # Errors
    /// Returns `BridgeError::RetriesExhausted` if no connection could be made.
    pub async fn start(
        connector: Arc<dyn TopicConnector>,
        bus: EventBus,
        retry: RetryPolicy,
    ) -> Result<Self, BridgeError> {
        let target = connector.describe();
        let (publisher, consumer) = retry
            .run(&format!("connect to {}", target), || connector.connect())
            .await?;

        let shared = Arc::new(BridgeShared {
            connector,
            publisher: RwLock::new(publisher),
            accepting: AtomicBool::new(true),
            retry,
        });
        let cancel = CancellationToken::new();
        let delivery = tokio::spawn(delivery_loop(
            shared.clone(),
            bus.clone(),
            consumer,
            cancel.clone(),
        ));

        info!("Broker bridge connected to {}", target);
        Ok(Self {
            bus,
            shared,
            cancel,
            delivery: Mutex::new(Some(delivery)),
        })
    }

    /// The local bus fed by the delivery loop
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }
}

#[async_trait]
impl EventHub for BrokerBridge {
    fn publish(&self, event: DraftEvent) -> EventResult<()> {
        if !self.shared.accepting.load(Ordering::SeqCst) {
            return Err(EventError::Closed);
        }
        let (routing_key, payload) =
            codec::encode(&event).map_err(|err| EventError::PublishError(err.to_string()))?;
        self.shared
            .publisher
            .read()
            .publish(routing_key, payload)
            .map_err(|err| EventError::PublishError(err.to_string()))
    }

    fn subscribe(&self) -> EventResult<Subscription> {
        self.bus.subscribe()
    }

    fn unsubscribe(&self, id: Uuid) {
        self.bus.unsubscribe(id);
    }

    fn subscriber_count(&self) -> usize {
        self.bus.subscriber_count()
    }

    /// Stops publishes, closes the topic connection and the embedded broker if there is one,
    /// then ends every local subscription.
    ///
    /// The publisher must be closed (and flushed) before the consumer: on AMQP the consumer
    /// owns the connection both share.
    async fn close(&self) {
        if !self.shared.accepting.swap(false, Ordering::SeqCst) {
            debug!("Broker bridge already closed");
            return;
        }

        self.shared.swap_publisher(Box::new(ClosedPublisher)).await;

        self.cancel.cancel();
        let delivery = self.delivery.lock().take();
        if let Some(handle) = delivery {
            if let Err(err) = handle.await {
                error!("Bridge delivery loop failed: {}", err);
            }
        }

        self.shared.connector.shutdown().await;
        self.bus.close_all();
        info!("Broker bridge closed");
    }
}

enum Next {
    Stop,
    Lost,
    Message(Delivery),
}

async fn delivery_loop(
    shared: Arc<BridgeShared>,
    bus: EventBus,
    mut consumer: Box<dyn TopicConsumer>,
    cancel: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => Next::Stop,
            delivery = consumer.receive() => match delivery {
                Some(delivery) => Next::Message(delivery),
                None => Next::Lost,
            },
        };

        match next {
            Next::Stop => break,
            Next::Message(delivery) => redeliver(&bus, consumer.as_mut(), delivery).await,
            Next::Lost => {
                warn!("Topic connection lost, reconnecting");
                consumer.close().await;
                match reconnect(&shared, &cancel).await {
                    Some(replacement) => consumer = replacement,
                    None => break,
                }
            }
        }
    }
    consumer.close().await;
    debug!("Bridge delivery loop stopped");
}

/// Republishes one delivery locally, then acknowledges it.
async fn redeliver(bus: &EventBus, consumer: &mut dyn TopicConsumer, delivery: Delivery) {
    match codec::decode(&delivery.payload) {
        Ok(event) => {
            if delivery.redelivered {
                debug!("Redelivery of {} ({})", delivery.tag, event.kind());
            }
            if let Err(err) = bus.publish(event) {
                // Left unacknowledged so the broker can deliver it again
                debug!("Local bus refused delivery {}: {}", delivery.tag, err);
                return;
            }
        }
        Err(err) => warn!("Discarding undecodable delivery {}: {}", delivery.tag, err),
    }

    if let Err(err) = consumer.ack(delivery.tag).await {
        warn!("{}", err);
    }
}

async fn reconnect(
    shared: &BridgeShared,
    cancel: &CancellationToken,
) -> Option<Box<dyn TopicConsumer>> {
    let target = shared.connector.describe();
    let what = format!("reconnect to {}", target);
    let attempt = shared.retry.run(&what, || shared.connector.connect());

    let outcome = tokio::select! {
        _ = cancel.cancelled() => None,
        result = attempt => Some(result),
    };

    match outcome {
        None => None,
        Some(Ok((publisher, mut consumer))) => {
            if !shared.install_publisher(publisher).await {
                consumer.close().await;
                return None;
            }
            info!("Broker bridge reconnected to {}", target);
            Some(consumer)
        }
        Some(Err(err)) => {
            error!("Broker bridge lost {} for good: {}", target, err);
            shared.swap_publisher(Box::new(ClosedPublisher)).await;
            None
        }
    }
}
