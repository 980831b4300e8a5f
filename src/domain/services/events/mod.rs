//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Change notifications for the draft room. The engine publishes a `DraftEvent` after every
// committed change; stream handlers subscribe and forward events to their clients.
//
// | Component          | Description                                                |
// |--------------------|------------------------------------------------------------|
// | DraftEvent         | Enum representing all change notifications                 |
// | EventHub           | Trait shared by the local bus and the broker bridge        |
// | EventBus           | In-process hub with bounded, non-blocking subscriber queues|
// | SubscriptionGuard  | Subscription that unsubscribes on drop                     |
//--------------------------------------------------------------------------------------------------

mod event_bus;
mod event_types;
mod hub;

#[cfg(test)]
mod tests;

// Re-exports
pub use event_bus::{DEFAULT_QUEUE_CAPACITY, EventBus, Subscription};
pub use event_types::{DraftEvent, EventError, EventResult};
pub use hub::{EventHub, SubscriptionGuard};
