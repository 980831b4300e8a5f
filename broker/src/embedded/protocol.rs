//! Wire frames exchanged between [`EmbeddedClient`](super::EmbeddedClient) and
//! [`EmbeddedBroker`](super::EmbeddedBroker).
//!
//! Each frame is a JSON document behind a 4-byte big-endian length prefix.

use bytes::Bytes;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::BrokerError;

const MAX_FRAME_LENGTH: usize = 8 * 1024 * 1024;

/// Where a new subscription starts reading a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliverPolicy {
    /// Replay everything still retained, then follow new messages
    All,
    /// Only messages appended after the subscription is registered
    New,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub(crate) enum ClientFrame {
    CreateStream {
        id: u64,
        stream: String,
        max_age_ms: u64,
    },
    Publish {
        id: u64,
        stream: String,
        payload: Vec<u8>,
    },
    Subscribe {
        id: u64,
        stream: String,
        policy: DeliverPolicy,
    },
    Ack {
        stream: String,
        seq: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub(crate) enum ServerFrame {
    Ok {
        id: u64,
    },
    PubAck {
        id: u64,
        seq: u64,
    },
    Err {
        id: u64,
        message: String,
    },
    Deliver {
        stream: String,
        seq: u64,
        deliveries: u32,
        payload: Vec<u8>,
    },
}

pub(crate) fn framed(socket: TcpStream) -> Framed<TcpStream, LengthDelimitedCodec> {
    let codec = LengthDelimitedCodec::builder()
        .max_frame_length(MAX_FRAME_LENGTH)
        .new_codec();
    Framed::new(socket, codec)
}

pub(crate) fn encode<T: Serialize>(frame: &T) -> Result<Bytes, BrokerError> {
    serde_json::to_vec(frame)
        .map(Bytes::from)
        .map_err(|err| BrokerError::FrameError(err.to_string()))
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, BrokerError> {
    serde_json::from_slice(bytes).map_err(|err| BrokerError::FrameError(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_frames_are_tagged_by_op() {
        let frame = ClientFrame::Ack {
            stream: "draft".to_owned(),
            seq: 7,
        };
        let bytes = encode(&frame).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["op"], "ack");
        assert_eq!(json["seq"], 7);
    }

    #[test]
    fn garbage_is_a_frame_error() {
        let err = decode::<ServerFrame>(b"not json").unwrap_err();
        assert!(matches!(err, BrokerError::FrameError(_)));
    }
}
