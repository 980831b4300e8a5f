//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name                  | Description                                      | Key Methods       |
// |-----------------------|--------------------------------------------------|-------------------|
// | EmbeddedBrokerConfig  | Listener and delivery settings                   | default           |
// | EmbeddedBroker        | Running broker handle                            | start, shutdown   |
// | Consumer              | Per-subscription delivery loop (internal)        | run               |
//--------------------------------------------------------------------------------------------------

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::protocol::{self, ClientFrame, DeliverPolicy, ServerFrame};
use super::stream_log::StreamLog;
use crate::BrokerError;

/// Listener and delivery settings for the embedded broker
#[derive(Debug, Clone)]
pub struct EmbeddedBrokerConfig {
    /// Address to listen on; port 0 picks an ephemeral port
    pub bind: SocketAddr,
    /// How long a delivery may stay unacknowledged before it is sent again
    pub ack_wait: Duration,
    /// Deliveries attempted per message before giving up on it
    pub max_deliver: u32,
    /// Unacknowledged deliveries allowed per subscription
    pub max_in_flight: usize,
    /// How often retention is enforced on idle streams
    pub sweep_interval: Duration,
}

impl Default for EmbeddedBrokerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 0)),
            ack_wait: Duration::from_secs(5),
            max_deliver: 5,
            max_in_flight: 256,
            sweep_interval: Duration::from_secs(1),
        }
    }
}

struct BrokerState {
    streams: Mutex<HashMap<String, StreamLog>>,
    config: EmbeddedBrokerConfig,
}

impl BrokerState {
    fn append(&self, stream: &str, payload: Bytes) -> Result<u64, BrokerError> {
        let mut streams = self.streams.lock();
        let log = streams
            .get_mut(stream)
            .ok_or_else(|| BrokerError::UnknownStream(stream.to_owned()))?;
        Ok(log.append(payload, Instant::now()))
    }

    /// Returns the head watcher and the first sequence a new subscription should receive.
    fn open_cursor(
        &self,
        stream: &str,
        policy: DeliverPolicy,
    ) -> Result<(watch::Receiver<u64>, u64), BrokerError> {
        let streams = self.streams.lock();
        let log = streams
            .get(stream)
            .ok_or_else(|| BrokerError::UnknownStream(stream.to_owned()))?;
        let start = match policy {
            DeliverPolicy::All => log.first_seq().unwrap_or_else(|| log.next_seq()),
            DeliverPolicy::New => log.next_seq(),
        };
        Ok((log.watch(), start))
    }

    fn prune_all(&self) {
        let now = Instant::now();
        let mut streams = self.streams.lock();
        for (name, log) in streams.iter_mut() {
            let dropped = log.prune(now);
            if dropped > 0 {
                debug!("stream {}: {} messages left the retention window", name, dropped);
            }
        }
    }
}

/// In-process durable-log broker
///
/// Streams are kept in memory with a time-based retention window. Clients talk to the broker
/// over TCP exactly as they would to a remote one, so a single-instance deployment exercises the
/// same publish/redeliver path as a networked one.
///
/// `shutdown()` MUST be called to stop the listener and disconnect clients.
pub struct EmbeddedBroker {
    local_addr: SocketAddr,
    state: Arc<BrokerState>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl EmbeddedBroker {
    /// Binds the listener and starts accepting clients.
    ///
    /// # Errors
    /// Returns `BrokerError::BindError` when the listening socket cannot be bound.
    pub async fn start(config: EmbeddedBrokerConfig) -> Result<Self, BrokerError> {
        let bind_error = |err: std::io::Error| BrokerError::BindError {
            addr: config.bind.to_string(),
            reason: err.to_string(),
        };
        let listener = TcpListener::bind(config.bind).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        let sweep_interval = config.sweep_interval;
        let state = Arc::new(BrokerState {
            streams: Mutex::new(HashMap::new()),
            config,
        });
        let cancel = CancellationToken::new();

        let accept_task = {
            let state = state.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                loop {
                    let accepted = tokio::select! {
                        _ = cancel.cancelled() => break,
                        accepted = listener.accept() => accepted,
                    };
                    match accepted {
                        Ok((socket, peer)) => {
                            debug!("embedded broker accepted {}", peer);
                            tokio::spawn(serve_connection(
                                socket,
                                peer,
                                state.clone(),
                                cancel.child_token(),
                            ));
                        }
                        Err(err) => warn!("embedded broker accept failed: {}", err),
                    }
                }
                debug!("embedded broker listener stopped");
            })
        };

        let sweep_task = {
            let state = state.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(sweep_interval);
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = ticker.tick() => state.prune_all(),
                    }
                }
            })
        };

        info!("Embedded broker listening on {}", local_addr);
        Ok(Self {
            local_addr,
            state,
            cancel,
            tasks: vec![accept_task, sweep_task],
        })
    }

    /// Address clients connect to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of retained messages in a stream, `None` if the stream does not exist
    pub fn retained(&self, stream: &str) -> Option<usize> {
        self.state.streams.lock().get(stream).map(StreamLog::len)
    }

    /// Stops the listener, disconnects every client and drops all streams.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(err) = task.await {
                error!("embedded broker task failed: {}", err);
            }
        }
        self.state.streams.lock().clear();
        info!("Embedded broker on {} stopped", self.local_addr);
    }
}

async fn serve_connection(
    socket: TcpStream,
    peer: SocketAddr,
    state: Arc<BrokerState>,
    cancel: CancellationToken,
) {
    let (mut sink, mut frames) = protocol::framed(socket).split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerFrame>();

    let writer_cancel = cancel.clone();
    tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            let bytes = match protocol::encode(&frame) {
                Ok(bytes) => bytes,
                Err(err) => {
                    error!("dropping unencodable frame for {}: {}", peer, err);
                    continue;
                }
            };
            if let Err(err) = sink.send(bytes).await {
                debug!("write to {} failed: {}", peer, err);
                break;
            }
        }
        writer_cancel.cancel();
    });

    let mut consumers: HashMap<String, mpsc::UnboundedSender<u64>> = HashMap::new();

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => None,
            frame = frames.next() => frame,
        };
        let bytes = match next {
            Some(Ok(bytes)) => bytes,
            Some(Err(err)) => {
                warn!("read from {} failed: {}", peer, err);
                break;
            }
            None => break,
        };
        let frame: ClientFrame = match protocol::decode(&bytes) {
            Ok(frame) => frame,
            Err(err) => {
                warn!("ignoring malformed frame from {}: {}", peer, err);
                continue;
            }
        };

        let reply = match frame {
            ClientFrame::CreateStream {
                id,
                stream,
                max_age_ms,
            } => {
                state
                    .streams
                    .lock()
                    .entry(stream.clone())
                    .or_insert_with(|| {
                        info!("creating stream {} (max age {}ms)", stream, max_age_ms);
                        StreamLog::new(Duration::from_millis(max_age_ms))
                    });
                Some(ServerFrame::Ok { id })
            }
            ClientFrame::Publish {
                id,
                stream,
                payload,
            } => Some(match state.append(&stream, Bytes::from(payload)) {
                Ok(seq) => ServerFrame::PubAck { id, seq },
                Err(err) => ServerFrame::Err {
                    id,
                    message: err.to_string(),
                },
            }),
            ClientFrame::Subscribe { id, stream, policy } => {
                if consumers.contains_key(&stream) {
                    Some(ServerFrame::Err {
                        id,
                        message: format!("already subscribed to {}", stream),
                    })
                } else {
                    match state.open_cursor(&stream, policy) {
                        Ok((head, cursor)) => {
                            let (ack_tx, ack_rx) = mpsc::unbounded_channel();
                            let consumer = Consumer {
                                stream: stream.clone(),
                                state: state.clone(),
                                out: out_tx.clone(),
                                acks: ack_rx,
                                head,
                                cursor,
                                pending: BTreeMap::new(),
                                cancel: cancel.child_token(),
                            };
                            tokio::spawn(consumer.run());
                            consumers.insert(stream, ack_tx);
                            Some(ServerFrame::Ok { id })
                        }
                        Err(err) => Some(ServerFrame::Err {
                            id,
                            message: err.to_string(),
                        }),
                    }
                }
            }
            ClientFrame::Ack { stream, seq } => {
                match consumers.get(&stream) {
                    Some(acks) => {
                        let _ = acks.send(seq);
                    }
                    None => debug!("ack for {}#{} without a subscription", stream, seq),
                }
                None
            }
        };

        if let Some(reply) = reply {
            if out_tx.send(reply).is_err() {
                break;
            }
        }
    }

    cancel.cancel();
    debug!("connection from {} closed", peer);
}

struct Pending {
    deadline: Instant,
    deliveries: u32,
}

enum Wake {
    Stop,
    Appended,
    Acked(u64),
    Sweep,
}

/// Follows one stream on behalf of one connection and tracks unacknowledged deliveries.
struct Consumer {
    stream: String,
    state: Arc<BrokerState>,
    out: mpsc::UnboundedSender<ServerFrame>,
    acks: mpsc::UnboundedReceiver<u64>,
    head: watch::Receiver<u64>,
    cursor: u64,
    pending: BTreeMap<u64, Pending>,
    cancel: CancellationToken,
}

impl Consumer {
    async fn run(mut self) {
        let ack_wait = self.state.config.ack_wait;
        let mut sweep = tokio::time::interval((ack_wait / 2).max(Duration::from_millis(10)));
        sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            if !self.deliver_new() {
                break;
            }

            let wake = tokio::select! {
                _ = self.cancel.cancelled() => Wake::Stop,
                changed = self.head.changed() => match changed {
                    Ok(()) => Wake::Appended,
                    Err(_) => Wake::Stop,
                },
                ack = self.acks.recv() => match ack {
                    Some(seq) => Wake::Acked(seq),
                    None => Wake::Stop,
                },
                _ = sweep.tick() => Wake::Sweep,
            };

            match wake {
                Wake::Stop => break,
                Wake::Appended => {}
                Wake::Acked(seq) => {
                    self.pending.remove(&seq);
                }
                Wake::Sweep => {
                    if !self.redeliver_expired() {
                        break;
                    }
                }
            }
        }
        debug!("consumer for {} stopped", self.stream);
    }

    /// Sends everything past the cursor that fits in the in-flight window.
    /// Returns `false` once the stream or the connection is gone.
    fn deliver_new(&mut self) -> bool {
        let capacity = self
            .state
            .config
            .max_in_flight
            .saturating_sub(self.pending.len());
        if capacity == 0 {
            return true;
        }

        let entries = {
            let streams = self.state.streams.lock();
            let Some(log) = streams.get(&self.stream) else {
                return false;
            };
            if let Some(first) = log.first_seq() {
                if self.cursor < first {
                    debug!(
                        "stream {}: skipping {} expired messages",
                        self.stream,
                        first - self.cursor
                    );
                    self.cursor = first;
                }
            }
            log.read_from(self.cursor, capacity)
        };

        let deadline = Instant::now() + self.state.config.ack_wait;
        for entry in entries {
            self.cursor = entry.seq + 1;
            self.pending.insert(
                entry.seq,
                Pending {
                    deadline,
                    deliveries: 1,
                },
            );
            let frame = ServerFrame::Deliver {
                stream: self.stream.clone(),
                seq: entry.seq,
                deliveries: 1,
                payload: entry.payload.to_vec(),
            };
            if self.out.send(frame).is_err() {
                return false;
            }
        }
        true
    }

    fn redeliver_expired(&mut self) -> bool {
        let now = Instant::now();
        let expired: Vec<u64> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.deadline <= now)
            .map(|(seq, _)| *seq)
            .collect();

        for seq in expired {
            let payload = self
                .state
                .streams
                .lock()
                .get(&self.stream)
                .and_then(|log| log.get(seq));
            let Some(pending) = self.pending.get_mut(&seq) else {
                continue;
            };

            match payload {
                None => {
                    debug!("stream {}#{} expired before it was acked", self.stream, seq);
                    self.pending.remove(&seq);
                }
                Some(_) if pending.deliveries >= self.state.config.max_deliver => {
                    warn!(
                        "stream {}#{} unacked after {} deliveries, giving up",
                        self.stream, seq, pending.deliveries
                    );
                    self.pending.remove(&seq);
                }
                Some(payload) => {
                    pending.deliveries += 1;
                    pending.deadline = now + self.state.config.ack_wait;
                    let frame = ServerFrame::Deliver {
                        stream: self.stream.clone(),
                        seq,
                        deliveries: pending.deliveries,
                        payload: payload.to_vec(),
                    };
                    if self.out.send(frame).is_err() {
                        return false;
                    }
                }
            }
        }
        true
    }
}
