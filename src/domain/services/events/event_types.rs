//--------------------------------------------------------------------------------------------------
// STRUCTS & ENUMS
//--------------------------------------------------------------------------------------------------
// | Name          | Description                                       | Key Methods       |
// |---------------|---------------------------------------------------|-------------------|
// | DraftEvent    | Change notification, one variant per event kind   | kind              |
// | EventError    | Error types for the event system                  |                   |
//--------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur in the event system
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// The hub has been closed and accepts no more publishes or subscriptions
    #[error("Event hub is closed")]
    Closed,

    /// Failed to hand an event to the durable topic
    #[error("Failed to publish event: {0}")]
    PublishError(String),
}

/// Type alias for Result with EventError
pub type EventResult<T> = Result<T, EventError>;

/// A change to the draft, sent to every subscriber.
///
/// On the wire an event is `{"type": "<kind>", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum DraftEvent {
    PlayerDrafted {
        player_id: Uuid,
        team_id: Uuid,
        pick_number: u32,
    },
    DraftReset {},
    TeamAdded {
        team_id: Uuid,
    },
    TeamOrderChanged {
        team_ids: Vec<Uuid>,
    },
    ScoreUpdated {
        player_id: Uuid,
        score: i32,
    },
    ChatMessageAdded {
        message_id: Uuid,
    },
    ChatReactionAdded {
        message_id: Uuid,
        emoji: String,
        count: usize,
    },
    PlayerAdded {
        player_id: Uuid,
    },
}

impl DraftEvent {
    /// The `type` tag of this event, also used as its routing key on the durable topic
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PlayerDrafted { .. } => "player-drafted",
            Self::DraftReset {} => "draft-reset",
            Self::TeamAdded { .. } => "team-added",
            Self::TeamOrderChanged { .. } => "team-order-changed",
            Self::ScoreUpdated { .. } => "score-updated",
            Self::ChatMessageAdded { .. } => "chat-message-added",
            Self::ChatReactionAdded { .. } => "chat-reaction-added",
            Self::PlayerAdded { .. } => "player-added",
        }
    }
}
