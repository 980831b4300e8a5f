//! In-process durable-log broker.
//!
//! [`EmbeddedBroker`] listens on a loopback port and keeps one append-only log per stream,
//! trimmed to a retention window. [`EmbeddedClient`] talks to it over TCP. Deliveries carry a
//! sequence number and must be acknowledged; anything left unacknowledged past the broker's ack
//! wait is delivered again, up to a configured number of attempts.

mod client;
mod protocol;
mod server;
mod stream_log;

pub use client::{EmbeddedClient, StreamMessage, StreamPublisher, StreamSubscription};
pub use protocol::DeliverPolicy;
pub use server::{EmbeddedBroker, EmbeddedBrokerConfig};
