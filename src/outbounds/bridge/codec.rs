//! Wire representation of events on the durable topic.
//!
//! The payload is the event's JSON form (`{"type": ..., "payload": {...}}`); the routing key is
//! the event kind.

use bytes::Bytes;

use super::BridgeError;
use crate::domain::services::events::DraftEvent;

pub fn encode(event: &DraftEvent) -> Result<(&'static str, Bytes), BridgeError> {
    let payload = serde_json::to_vec(event)?;
    Ok((event.kind(), Bytes::from(payload)))
}

pub fn decode(payload: &[u8]) -> Result<DraftEvent, BridgeError> {
    Ok(serde_json::from_slice(payload)?)
}
