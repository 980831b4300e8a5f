use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::event_bus::Subscription;
use super::event_types::{DraftEvent, EventResult};

/// What the engine and the stream handlers see of the event system.
///
/// Implemented by the plain [`EventBus`](super::EventBus) and by the broker bridge, which is
/// picked once at startup from configuration.
#[async_trait]
pub trait EventHub: Send + Sync {
    /// Hands an event to every subscriber without blocking
    fn publish(&self, event: DraftEvent) -> EventResult<()>;

    fn subscribe(&self) -> EventResult<Subscription>;

    /// Deregisters a subscription; unknown or already removed ids are ignored
    fn unsubscribe(&self, id: Uuid);

    fn subscriber_count(&self) -> usize;

    /// Stops the hub and ends every subscription
    async fn close(&self);
}

/// A subscription that unsubscribes itself when dropped.
///
/// Stream handlers keep one of these for as long as their client is connected, so the registry
/// loses the queue however the connection ends.
pub struct SubscriptionGuard {
    hub: Arc<dyn EventHub>,
    subscription: Subscription,
}

impl SubscriptionGuard {
    pub fn subscribe(hub: Arc<dyn EventHub>) -> EventResult<Self> {
        let subscription = hub.subscribe()?;
        Ok(Self { hub, subscription })
    }

    pub fn id(&self) -> Uuid {
        self.subscription.id()
    }

    pub async fn recv(&mut self) -> Option<DraftEvent> {
        self.subscription.recv().await
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.subscription.id());
    }
}
