use std::time::Duration;

use broker::{BrokerError, DeliverPolicy, EmbeddedBroker, EmbeddedBrokerConfig, EmbeddedClient};
use bytes::Bytes;
use tokio::time;
use tracing::debug;

const STREAM: &str = "draft-events";
const RETENTION: Duration = Duration::from_secs(60);

async fn start_broker(config: EmbeddedBrokerConfig) -> (EmbeddedBroker, EmbeddedClient) {
    let broker = EmbeddedBroker::start(config).await.unwrap();
    let client = EmbeddedClient::connect(broker.local_addr()).await.unwrap();
    client.create_stream(STREAM, RETENTION).await.unwrap();
    (broker, client)
}

#[test_log::test(tokio::test)]
async fn published_messages_come_back_in_order() {
    let (broker, client) = start_broker(EmbeddedBrokerConfig::default()).await;
    let mut subscription = client.subscribe(STREAM, DeliverPolicy::New).await.unwrap();
    let publisher = client.publisher(STREAM);

    for text in ["one", "two", "three"] {
        publisher.publish(Bytes::from_static(text.as_bytes())).unwrap();
    }

    for (expected_seq, text) in [(1, "one"), (2, "two"), (3, "three")] {
        let message = time::timeout(Duration::from_secs(2), subscription.receive())
            .await
            .unwrap()
            .unwrap();
        debug!("received {:?}", message);
        assert_eq!(message.seq, expected_seq);
        assert_eq!(message.deliveries, 1);
        assert_eq!(message.payload, Bytes::from_static(text.as_bytes()));
        subscription.ack(message.seq).unwrap();
    }

    client.close().await;
    broker.shutdown().await;
}

#[test_log::test(tokio::test)]
async fn confirmed_publish_returns_the_sequence() {
    let (broker, client) = start_broker(EmbeddedBrokerConfig::default()).await;
    let publisher = client.publisher(STREAM);

    assert_eq!(publisher.publish_confirmed(Bytes::from_static(b"a")).await.unwrap(), 1);
    assert_eq!(publisher.publish_confirmed(Bytes::from_static(b"b")).await.unwrap(), 2);
    assert_eq!(broker.retained(STREAM), Some(2));

    client.close().await;
    broker.shutdown().await;
}

#[test_log::test(tokio::test)]
async fn deliver_all_replays_retained_history() {
    let (broker, client) = start_broker(EmbeddedBrokerConfig::default()).await;
    let publisher = client.publisher(STREAM);
    publisher.publish_confirmed(Bytes::from_static(b"early")).await.unwrap();

    let late = EmbeddedClient::connect(broker.local_addr()).await.unwrap();
    let mut replay = late.subscribe(STREAM, DeliverPolicy::All).await.unwrap();
    let message = time::timeout(Duration::from_secs(2), replay.receive())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message.payload, Bytes::from_static(b"early"));

    let fresh = EmbeddedClient::connect(broker.local_addr()).await.unwrap();
    let mut only_new = fresh.subscribe(STREAM, DeliverPolicy::New).await.unwrap();
    publisher.publish_confirmed(Bytes::from_static(b"late")).await.unwrap();
    let message = time::timeout(Duration::from_secs(2), only_new.receive())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message.payload, Bytes::from_static(b"late"));
    assert_eq!(message.seq, 2);

    fresh.close().await;
    late.close().await;
    client.close().await;
    broker.shutdown().await;
}

#[test_log::test(tokio::test)]
async fn unacked_messages_are_redelivered_up_to_the_limit() {
    let config = EmbeddedBrokerConfig {
        ack_wait: Duration::from_millis(100),
        max_deliver: 3,
        ..EmbeddedBrokerConfig::default()
    };
    let (broker, client) = start_broker(config).await;
    let mut subscription = client.subscribe(STREAM, DeliverPolicy::New).await.unwrap();
    client
        .publisher(STREAM)
        .publish_confirmed(Bytes::from_static(b"never acked"))
        .await
        .unwrap();

    let mut attempts = Vec::new();
    while let Ok(Some(message)) =
        time::timeout(Duration::from_millis(600), subscription.receive()).await
    {
        assert_eq!(message.seq, 1);
        attempts.push(message.deliveries);
    }
    assert_eq!(attempts, vec![1, 2, 3]);

    client.close().await;
    broker.shutdown().await;
}

#[test_log::test(tokio::test)]
async fn acked_messages_are_not_redelivered() {
    let config = EmbeddedBrokerConfig {
        ack_wait: Duration::from_millis(100),
        ..EmbeddedBrokerConfig::default()
    };
    let (broker, client) = start_broker(config).await;
    let mut subscription = client.subscribe(STREAM, DeliverPolicy::New).await.unwrap();
    client
        .publisher(STREAM)
        .publish(Bytes::from_static(b"acked"))
        .unwrap();

    let message = subscription.receive().await.unwrap();
    subscription.ack(message.seq).unwrap();

    let again = time::timeout(Duration::from_millis(400), subscription.receive()).await;
    assert!(again.is_err());

    client.close().await;
    broker.shutdown().await;
}

#[test_log::test(tokio::test)]
async fn unknown_stream_is_rejected() {
    let (broker, client) = start_broker(EmbeddedBrokerConfig::default()).await;

    let err = client
        .subscribe("missing", DeliverPolicy::New)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, BrokerError::Rejected(_)));

    let err = client
        .publisher("missing")
        .publish_confirmed(Bytes::from_static(b"x"))
        .await
        .unwrap_err();
    assert!(matches!(err, BrokerError::Rejected(_)));

    client.close().await;
    broker.shutdown().await;
}

#[test_log::test(tokio::test)]
async fn subscriptions_end_when_the_broker_stops() {
    let (broker, client) = start_broker(EmbeddedBrokerConfig::default()).await;
    let mut subscription = client.subscribe(STREAM, DeliverPolicy::New).await.unwrap();

    broker.shutdown().await;

    let ended = time::timeout(Duration::from_secs(2), subscription.receive())
        .await
        .unwrap();
    assert!(ended.is_none());
    assert!(client.publisher(STREAM).publish(Bytes::from_static(b"x")).is_err());
}
