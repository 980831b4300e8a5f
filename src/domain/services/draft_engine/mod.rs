use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::{
    ChatMessage, DraftPick, DraftSnapshot, NewMessage, NewPlayer, NewTeam, Player, Team,
};
use crate::domain::services::state_store::StoreError;

pub mod draft_engine;
pub mod scoring;

pub use self::draft_engine::DraftEngine;

/// Operations on the draft.
///
/// Every mutating operation runs as one state-store transaction and publishes its event only
/// after the transaction has committed. Implementations must be thread-safe; concurrent calls
/// are linearized by the store.
pub trait DraftService: Send + Sync {
    /// Assigns a player to a team.
    ///
    /// # Returns
    /// * `Ok(DraftPick)` - The pick, with the player's new adjustable score
    /// * `Err(DraftError::AlreadyDrafted)` - The player was taken by an earlier pick
    /// * `Err(DraftError::PlayerNotFound | TeamNotFound)` - Unknown player or team
    fn draft_player(&self, player_id: Uuid, team_id: Uuid) -> Result<DraftPick, DraftError>;

    /// Undrafts every player, restores adjustable scores and empties all rosters.
    fn reset_draft(&self) -> Result<(), DraftError>;

    /// Current draft state with turn information recomputed from it.
    fn snapshot(&self) -> Result<DraftSnapshot, DraftError>;

    fn add_team(&self, team: NewTeam) -> Result<Team, DraftError>;

    /// Rearranges the team list. `order` must be a permutation of the current team ids.
    fn reorder_teams(&self, order: Vec<Uuid>) -> Result<Vec<Team>, DraftError>;

    fn add_player(&self, player: NewPlayer) -> Result<Player, DraftError>;

    /// Overwrites a player's popularity score.
    fn set_player_score(&self, player_id: Uuid, score: i32) -> Result<Player, DraftError>;

    fn add_message(&self, message: NewMessage) -> Result<ChatMessage, DraftError>;

    /// Adds `user`'s `emoji` reaction to a message.
    ///
    /// A repeated (message, user, emoji) reaction returns the message unchanged.
    fn add_reaction(
        &self,
        message_id: Uuid,
        emoji: &str,
        user: &str,
    ) -> Result<ChatMessage, DraftError>;

    /// Chat messages in posting order
    fn messages(&self) -> Result<Vec<ChatMessage>, DraftError>;
}

/// Errors returned by draft operations.
#[derive(Debug, Error)]
pub enum DraftError {
    /// No player with this id.
    #[error("Player {0} not found")]
    PlayerNotFound(Uuid),

    /// No team with this id.
    #[error("Team {0} not found")]
    TeamNotFound(Uuid),

    /// No chat message with this id.
    #[error("Message {0} not found")]
    MessageNotFound(Uuid),

    /// The player was already taken.
    #[error("Player {0} has already been drafted")]
    AlreadyDrafted(Uuid),

    /// The request is well-formed but not acceptable.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The state store failed; nothing was changed.
    #[error("State store error: {0}")]
    Store(#[from] StoreError),
}

impl DraftError {
    /// Not-found, conflict and validation errors are the caller's to handle
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}

/// +----------------------------------------------------------+
/// | MODULES                                                  |
/// +----------+-------+-------+------------------------------+
/// | Exports:                                                 |
/// |   - DraftService (trait)                                 |
/// |   - DraftEngine (struct)                                 |
/// |   - DraftError (enum)                                    |
/// |   - MockDraftService (for tests)                         |
/// +----------------------------------------------------------+

#[cfg(test)]
use mockall::*;

#[cfg(test)]
mock! {
    pub DraftService {}

    impl DraftService for DraftService {
        fn draft_player(&self, player_id: Uuid, team_id: Uuid) -> Result<DraftPick, DraftError>;

        fn reset_draft(&self) -> Result<(), DraftError>;

        fn snapshot(&self) -> Result<DraftSnapshot, DraftError>;

        fn add_team(&self, team: NewTeam) -> Result<Team, DraftError>;

        fn reorder_teams(&self, order: Vec<Uuid>) -> Result<Vec<Team>, DraftError>;

        fn add_player(&self, player: NewPlayer) -> Result<Player, DraftError>;

        fn set_player_score(&self, player_id: Uuid, score: i32) -> Result<Player, DraftError>;

        fn add_message(&self, message: NewMessage) -> Result<ChatMessage, DraftError>;

        fn add_reaction(&self, message_id: Uuid, emoji: &str, user: &str) -> Result<ChatMessage, DraftError>;

        fn messages(&self) -> Result<Vec<ChatMessage>, DraftError>;
    }
}
