use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::protocol::{self, ClientFrame, DeliverPolicy, ServerFrame};
use crate::BrokerError;

/// Publishes sent without waiting for a confirmation use this request id
const UNCONFIRMED: u64 = 0;

type Reply = Result<u64, BrokerError>;

/// A message delivered from a stream
#[derive(Debug, Clone, PartialEq)]
pub struct StreamMessage {
    pub stream: String,
    /// Position in the stream, used to acknowledge the message
    pub seq: u64,
    /// 1 on first delivery, higher when the broker is redelivering
    pub deliveries: u32,
    pub payload: Bytes,
}

struct ClientShared {
    out: mpsc::UnboundedSender<ClientFrame>,
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, oneshot::Sender<Reply>>>,
    subscriptions: Mutex<HashMap<String, mpsc::UnboundedSender<StreamMessage>>>,
    cancel: CancellationToken,
}

impl ClientShared {
    fn send(&self, frame: ClientFrame) -> Result<(), BrokerError> {
        if self.cancel.is_cancelled() {
            return Err(BrokerError::ConnectionClosed);
        }
        self.out
            .send(frame)
            .map_err(|_| BrokerError::ConnectionClosed)
    }

    async fn request(&self, build: impl FnOnce(u64) -> ClientFrame) -> Reply {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        if let Err(err) = self.send(build(id)) {
            self.pending.lock().remove(&id);
            return Err(err);
        }
        rx.await.unwrap_or(Err(BrokerError::ConnectionClosed))
    }

    fn resolve(&self, id: u64, reply: Reply) {
        if id == UNCONFIRMED {
            if let Err(err) = reply {
                warn!("unconfirmed publish rejected: {}", err);
            }
            return;
        }
        match self.pending.lock().remove(&id) {
            Some(waiter) => {
                let _ = waiter.send(reply);
            }
            None => debug!("reply for unknown request {}", id),
        }
    }

    fn deliver(&self, message: StreamMessage) {
        let subscriptions = self.subscriptions.lock();
        match subscriptions.get(&message.stream) {
            Some(subscriber) => {
                let _ = subscriber.send(message);
            }
            None => debug!(
                "delivery for {}#{} without a local subscriber",
                message.stream, message.seq
            ),
        }
    }

    /// Fails every waiting request and ends every subscription.
    fn disconnect(&self) {
        self.cancel.cancel();
        for (_, waiter) in self.pending.lock().drain() {
            let _ = waiter.send(Err(BrokerError::ConnectionClosed));
        }
        self.subscriptions.lock().clear();
    }
}

/// Connection to an [`EmbeddedBroker`](super::EmbeddedBroker)
///
/// Requests are multiplexed over one TCP connection. When the connection drops, waiting requests
/// fail with `BrokerError::ConnectionClosed` and every [`StreamSubscription`] ends.
pub struct EmbeddedClient {
    shared: Arc<ClientShared>,
    tasks: Vec<JoinHandle<()>>,
}

impl EmbeddedClient {
    pub async fn connect(addr: SocketAddr) -> Result<Self, BrokerError> {
        let socket = TcpStream::connect(addr)
            .await
            .map_err(|err| BrokerError::ConnectionError(format!("{}: {}", addr, err)))?;
        let (mut sink, mut frames) = protocol::framed(socket).split();
        let (out, mut out_rx) = mpsc::unbounded_channel::<ClientFrame>();

        let shared = Arc::new(ClientShared {
            out,
            next_id: AtomicU64::new(UNCONFIRMED + 1),
            pending: Mutex::new(HashMap::new()),
            subscriptions: Mutex::new(HashMap::new()),
            cancel: CancellationToken::new(),
        });

        let writer = {
            let cancel = shared.cancel.clone();
            tokio::spawn(async move {
                loop {
                    let frame = tokio::select! {
                        _ = cancel.cancelled() => break,
                        frame = out_rx.recv() => frame,
                    };
                    let Some(frame) = frame else { break };
                    let bytes = match protocol::encode(&frame) {
                        Ok(bytes) => bytes,
                        Err(err) => {
                            warn!("dropping unencodable frame: {}", err);
                            continue;
                        }
                    };
                    if let Err(err) = sink.send(bytes).await {
                        debug!("embedded broker write failed: {}", err);
                        break;
                    }
                }
                let _ = sink.close().await;
            })
        };

        let reader = {
            let shared = shared.clone();
            tokio::spawn(async move {
                loop {
                    let next = tokio::select! {
                        _ = shared.cancel.cancelled() => None,
                        next = frames.next() => next,
                    };
                    let bytes = match next {
                        Some(Ok(bytes)) => bytes,
                        Some(Err(err)) => {
                            debug!("embedded broker read failed: {}", err);
                            break;
                        }
                        None => break,
                    };
                    match protocol::decode::<ServerFrame>(&bytes) {
                        Ok(ServerFrame::Ok { id }) => shared.resolve(id, Ok(0)),
                        Ok(ServerFrame::PubAck { id, seq }) => shared.resolve(id, Ok(seq)),
                        Ok(ServerFrame::Err { id, message }) => {
                            shared.resolve(id, Err(BrokerError::Rejected(message)))
                        }
                        Ok(ServerFrame::Deliver {
                            stream,
                            seq,
                            deliveries,
                            payload,
                        }) => shared.deliver(StreamMessage {
                            stream,
                            seq,
                            deliveries,
                            payload: Bytes::from(payload),
                        }),
                        Err(err) => warn!("ignoring malformed frame from broker: {}", err),
                    }
                }
                shared.disconnect();
            })
        };

        debug!("connected to embedded broker at {}", addr);
        Ok(Self {
            shared,
            tasks: vec![writer, reader],
        })
    }

    /// Creates a stream with the given retention window. Creating an existing stream is a no-op.
    pub async fn create_stream(&self, stream: &str, max_age: Duration) -> Result<(), BrokerError> {
        let max_age_ms = u64::try_from(max_age.as_millis()).unwrap_or(u64::MAX);
        self.shared
            .request(|id| ClientFrame::CreateStream {
                id,
                stream: stream.to_owned(),
                max_age_ms,
            })
            .await
            .map(|_| ())
    }

    pub fn publisher(&self, stream: &str) -> StreamPublisher {
        StreamPublisher {
            stream: stream.to_owned(),
            shared: self.shared.clone(),
        }
    }

    /// Starts following a stream. Only one subscription per stream is allowed per client.
    pub async fn subscribe(
        &self,
        stream: &str,
        policy: DeliverPolicy,
    ) -> Result<StreamSubscription, BrokerError> {
        let (tx, rx) = mpsc::unbounded_channel();
        // Registered first: the broker may start delivering before the reply arrives.
        self.shared
            .subscriptions
            .lock()
            .insert(stream.to_owned(), tx);

        let subscribed = self
            .shared
            .request(|id| ClientFrame::Subscribe {
                id,
                stream: stream.to_owned(),
                policy,
            })
            .await;
        if let Err(err) = subscribed {
            self.shared.subscriptions.lock().remove(stream);
            return Err(err);
        }

        Ok(StreamSubscription {
            stream: stream.to_owned(),
            messages: rx,
            shared: self.shared.clone(),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// Closes the connection and waits for the I/O tasks to finish.
    pub async fn close(self) {
        self.shared.disconnect();
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

/// Publishes onto one stream
#[derive(Clone)]
pub struct StreamPublisher {
    stream: String,
    shared: Arc<ClientShared>,
}

impl StreamPublisher {
    /// Queues a message for the broker without waiting for its confirmation.
    ///
    /// Only fails when the connection is already closed; a rejection by the broker is logged.
    pub fn publish(&self, payload: Bytes) -> Result<(), BrokerError> {
        self.shared.send(ClientFrame::Publish {
            id: UNCONFIRMED,
            stream: self.stream.clone(),
            payload: payload.to_vec(),
        })
    }

    /// Publishes and waits until the broker has stored the message. Returns its sequence.
    pub async fn publish_confirmed(&self, payload: Bytes) -> Result<u64, BrokerError> {
        let stream = self.stream.clone();
        let payload = payload.to_vec();
        self.shared
            .request(move |id| ClientFrame::Publish {
                id,
                stream,
                payload,
            })
            .await
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }
}

/// Deliveries from one stream
pub struct StreamSubscription {
    stream: String,
    messages: mpsc::UnboundedReceiver<StreamMessage>,
    shared: Arc<ClientShared>,
}

impl StreamSubscription {
    /// Next delivery, `None` once the connection is closed
    pub async fn receive(&mut self) -> Option<StreamMessage> {
        self.messages.recv().await
    }

    pub fn ack(&self, seq: u64) -> Result<(), BrokerError> {
        self.shared
            .send(ClientFrame::Ack {
                stream: self.stream.clone(),
                seq,
            })
            .map_err(|err| BrokerError::AckMessageError(err.to_string()))
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }
}
