use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::{ChatMessage, Player, Team, TeamRef};

/// The whole draft: players, teams in draft order, and chat.
///
/// The engine works on this through the state store; it is never shared as a global.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftState {
    pub players: Vec<Player>,
    /// Teams in draft order
    pub teams: Vec<Team>,
    pub messages: Vec<ChatMessage>,
}

/// Read-only view of the draft, with turn information recomputed from current state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    pub players: Vec<Player>,
    pub teams: Vec<Team>,
    pub total_drafted: u32,
    /// Pick number the next selection will get
    pub next_pick: u32,
    /// 1-based round of the next selection
    pub round: u32,
    /// Team whose turn it is, `None` while no team is registered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_the_clock: Option<TeamRef>,
}

/// Outcome of a successful pick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftPick {
    pub pick_number: u32,
    pub player: Player,
    pub team: TeamRef,
    pub previous_score: i32,
    pub adjustment: i32,
    /// Chat message generated for the pick
    pub announcement: Uuid,
}
