use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::{DraftPick, Player, TeamRef};

/// +----------------------------------------------------------+
/// | STRUCTS | TRAITS | ENUMS | FUNCTIONS                     |
/// +----------+-------+-------+------------------------------+
/// | Structs:                                                 |
/// |   - PickRequest                                          |
/// |   - PickResponse                                         |
/// |   - ReorderTeamsRequest                                  |
/// |   - SetScoreRequest                                      |
/// |   - ReactionRequest                                      |
/// | Implementations:                                         |
/// |   - From<DraftPick> for PickResponse                     |
/// +----------------------------------------------------------+

/// Request to draft a player onto a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickRequest {
    pub player_id: Uuid,
    pub team_id: Uuid,
}

/// Result of a pick as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickResponse {
    pub pick_number: u32,
    pub player: Player,
    pub team: TeamRef,
    /// Adjustable score before the pick
    pub previous_score: i32,
    /// Adjustable score after the pick, clamped
    pub new_score: i32,
    pub adjustment: i32,
    /// Id of the chat message announcing the pick
    pub announcement: Uuid,
}

impl From<DraftPick> for PickResponse {
    fn from(pick: DraftPick) -> Self {
        Self {
            pick_number: pick.pick_number,
            new_score: pick.player.adjustable_score,
            player: pick.player,
            team: pick.team,
            previous_score: pick.previous_score,
            adjustment: pick.adjustment,
            announcement: pick.announcement,
        }
    }
}

/// New draft order; must name every team exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderTeamsRequest {
    pub team_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetScoreRequest {
    pub score: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionRequest {
    pub emoji: String,
    pub user: String,
}
