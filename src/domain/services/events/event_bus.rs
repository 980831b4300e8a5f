//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// In-process publish/subscribe hub. Every subscriber owns a bounded queue; publishing copies the
// current subscriber list and offers the event to each queue without waiting.
//
// | Component     | Description                                                 |
// |---------------|-------------------------------------------------------------|
// | EventBus      | Subscriber registry and fan-out                             |
// | Subscription  | Receiving end of one subscriber queue                       |
//
//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name          | Description                                   | Key Methods                   |
// |---------------|-----------------------------------------------|-------------------------------|
// | EventBus      | Central event publishing component            | publish, subscribe, close_all |
// | Subscription  | Bounded per-subscriber queue                  | recv, try_recv                |
//
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::event_types::{DraftEvent, EventError, EventResult};
use super::hub::EventHub;

/// Default number of events a subscriber queue holds
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Receiving end of a subscriber queue
#[derive(Debug)]
pub struct Subscription {
    id: Uuid,
    receiver: mpsc::Receiver<DraftEvent>,
}

impl Subscription {
    /// Returns the subscription ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Waits for the next event. Returns `None` once the subscription is unsubscribed or the
    /// hub is closed and every queued event has been read.
    pub async fn recv(&mut self) -> Option<DraftEvent> {
        self.receiver.recv().await
    }

    /// Next queued event without waiting
    pub fn try_recv(&mut self) -> Option<DraftEvent> {
        self.receiver.try_recv().ok()
    }
}

/// In-process event bus.
///
/// Publishing never blocks: when a subscriber's queue is full, that subscriber misses the event
/// and everyone else still gets it. The queue keeps what it already holds, so a subscriber that
/// stops reading sees the oldest events, not the newest.
#[derive(Debug, Clone)]
pub struct EventBus {
    inner: Arc<RwLock<EventBusInner>>,
    capacity: usize,
}

#[derive(Debug, Default)]
struct EventBusInner {
    senders: HashMap<Uuid, mpsc::Sender<DraftEvent>>,
    closed: bool,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl EventBus {
    /// Creates a bus whose subscriber queues hold `capacity` events each.
    pub fn new(capacity: usize) -> Self {
        info!("Created new EventBus with queue capacity: {}", capacity);
        Self {
            inner: Arc::new(RwLock::new(EventBusInner::default())),
            capacity: capacity.max(1),
        }
    }

    /// Registers a new bounded queue
    pub fn subscribe(&self) -> EventResult<Subscription> {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let id = Uuid::new_v4();

        let mut inner = self.inner.write();
        if inner.closed {
            return Err(EventError::Closed);
        }
        inner.senders.insert(id, sender);
        debug!("Subscriber {} added (total: {})", id, inner.senders.len());

        Ok(Subscription { id, receiver })
    }

    /// Removes a subscriber and closes its queue. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: Uuid) -> bool {
        let removed = self.inner.write().senders.remove(&id).is_some();
        if removed {
            debug!("Subscriber {} removed", id);
        }
        removed
    }

    /// Offers an event to every current subscriber.
    pub fn publish(&self, event: DraftEvent) -> EventResult<()> {
        let senders = {
            let inner = self.inner.read();
            if inner.closed {
                return Err(EventError::Closed);
            }
            inner
                .senders
                .iter()
                .map(|(id, sender)| (*id, sender.clone()))
                .collect::<Vec<_>>()
        };

        let mut gone = Vec::new();
        for (id, sender) in senders {
            match sender.try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!("Subscriber {} queue full, dropping {}", id, event.kind());
                }
                Err(TrySendError::Closed(_)) => gone.push(id),
            }
        }

        if !gone.is_empty() {
            let mut inner = self.inner.write();
            for id in gone {
                debug!("Subscriber {} went away, removing", id);
                inner.senders.remove(&id);
            }
        }
        Ok(())
    }

    /// Closes every subscriber queue and refuses new subscriptions and publishes.
    pub fn close_all(&self) {
        let mut inner = self.inner.write();
        inner.closed = true;
        let count = inner.senders.len();
        inner.senders.clear();
        info!("EventBus closed ({} subscribers disconnected)", count);
    }

    /// Returns the number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.inner.read().senders.len()
    }

    /// Returns the per-subscriber queue capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[async_trait]
impl EventHub for EventBus {
    fn publish(&self, event: DraftEvent) -> EventResult<()> {
        EventBus::publish(self, event)
    }

    fn subscribe(&self) -> EventResult<Subscription> {
        EventBus::subscribe(self)
    }

    fn unsubscribe(&self, id: Uuid) {
        EventBus::unsubscribe(self, id);
    }

    fn subscriber_count(&self) -> usize {
        EventBus::subscriber_count(self)
    }

    async fn close(&self) {
        self.close_all();
    }
}
