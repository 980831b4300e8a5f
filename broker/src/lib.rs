//! Durable topic plumbing for the draft room.
//!
//! Two interchangeable transports live here:
//!
//! - [`amqp`]: a durable `topic` exchange on an external RabbitMQ cluster, used when several
//!   draft-room instances share one event topic.
//! - [`embedded`]: an in-process durable-log broker listening on an ephemeral loopback port,
//!   used for single-instance and offline deployments so they keep the same
//!   "publish goes out to the topic and comes back" path as networked ones.
//!
//! Neither transport knows anything about draft events: payloads are opaque bytes.

pub mod amqp;
pub mod embedded;

pub use amqp::{
    AmqpTopicConfig, Message, PublisherContext, TopicPublisher, TopicSubscription, open_topic,
};
pub use embedded::{
    DeliverPolicy, EmbeddedBroker, EmbeddedBrokerConfig, EmbeddedClient, StreamMessage,
    StreamPublisher, StreamSubscription,
};

/// Error types for broker operations
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// Error in the provided URI
    #[error("Provided URI Error: {0}")]
    UriError(String),
    /// Error establishing connection
    #[error("Connection error: {0}")]
    ConnectionError(String),
    /// Error opening a channel
    #[error("Error while opening a rabbitmq channel: {0}")]
    OpenChannelError(String),
    /// Error declaring a queue
    #[error("Error while declaring a queue: {0}")]
    QueueDeclarationError(String),
    /// Error declaring an exchange
    #[error("Error while declaring a exchange: {0}")]
    ExchangeDeclarationError(String),
    /// Error starting to consume from a subscription
    #[error("Error while starting to consume from a subscription: {0}")]
    SubscriptionError(String),
    /// Error binding a queue to an exchange
    #[error("Error while binding a queue to exchange: {0}")]
    QueueBindingError(String),
    /// Error closing a channel or connection
    #[error("Error while closing a channel: {0}")]
    CloseChannelError(String),
    /// The background publishing task is gone
    #[error("Error while publishing a message - channel was dropped or closed")]
    PublishError,
    /// Error while acknowledging a message
    #[error("Error while acknowledging a message: {0}")]
    AckMessageError(String),
    /// Message does not contain delivery tag
    #[error("Unexpected error: message does not contain delivery tag")]
    NotDeliveryTag,
    /// The embedded broker could not bind its listening socket
    #[error("Embedded broker failed to bind {addr}: {reason}")]
    BindError { addr: String, reason: String },
    /// A frame could not be encoded or decoded
    #[error("Malformed frame: {0}")]
    FrameError(String),
    /// Missing routing key when publishing to the topic exchange
    #[error("Topic publisher MUST have a routing key")]
    MissingTopic,
    /// The peer closed the connection
    #[error("Connection closed")]
    ConnectionClosed,
    /// The stream does not exist on the embedded broker
    #[error("Unknown stream: {0}")]
    UnknownStream(String),
    /// The embedded broker rejected a request
    #[error("Broker rejected request: {0}")]
    Rejected(String),
}
