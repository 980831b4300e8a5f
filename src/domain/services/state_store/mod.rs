//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Port between the draft engine and whatever holds players, teams and chat. Every engine
// operation runs inside one `StoreTransaction`: reads and writes made through it are isolated
// from other transactions and take effect together on `commit`. Dropping a transaction without
// committing discards its writes.
//
// | Component         | Description                                              |
// |-------------------|----------------------------------------------------------|
// | StateStore        | Opens transactions                                       |
// | StoreTransaction  | Reads and writes composed into one atomic unit           |
// | StoreError        | Infrastructure failures of the store                     |
//--------------------------------------------------------------------------------------------------

use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::{ChatMessage, Player, RosterEntry, Team, TeamRef};

/// Infrastructure failures of a state store. Missing records are not errors: reads return
/// `None` and the engine decides what that means.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The transaction lost a race with another writer and was not applied
    #[error("Transaction conflict: {0}")]
    Conflict(String),

    /// The backing store could not be reached
    #[error("State store unavailable: {0}")]
    Unavailable(String),

    /// A write referenced a record that does not exist
    #[error("Record not found in store: {0}")]
    MissingRecord(String),
}

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Opens transactions on the draft state
pub trait StateStore: Send + Sync {
    /// Starts a transaction. Transactions are serialized: a second `begin` waits until the
    /// first one is committed or dropped.
    fn begin(&self) -> StoreResult<Box<dyn StoreTransaction + '_>>;
}

/// One atomic unit of reads and writes
pub trait StoreTransaction {
    fn read_player(&self, id: Uuid) -> StoreResult<Option<Player>>;

    fn read_team(&self, id: Uuid) -> StoreResult<Option<Team>>;

    fn read_message(&self, id: Uuid) -> StoreResult<Option<ChatMessage>>;

    /// Players in registration order
    fn players(&self) -> StoreResult<Vec<Player>>;

    /// Teams in draft order
    fn teams(&self) -> StoreResult<Vec<Team>>;

    /// Chat messages in posting order
    fn messages(&self) -> StoreResult<Vec<ChatMessage>>;

    fn count_drafted(&self) -> StoreResult<u32>;

    /// Marks a player drafted by `team` with its new adjustable score
    fn write_drafted_player(&mut self, id: Uuid, team: &TeamRef, new_score: i32)
    -> StoreResult<()>;

    fn append_roster_entry(&mut self, team_id: Uuid, entry: RosterEntry) -> StoreResult<()>;

    /// Appends a generated chat message and returns it
    fn append_system_message(&mut self, text: &str) -> StoreResult<ChatMessage>;

    /// Inserts a new player or replaces an existing one with the same id
    fn write_player(&mut self, player: Player) -> StoreResult<()>;

    /// Inserts a new team at the end of the draft order or replaces an existing one
    fn write_team(&mut self, team: Team) -> StoreResult<()>;

    /// Rearranges the teams; `order` must name every team exactly once
    fn write_team_order(&mut self, order: &[Uuid]) -> StoreResult<()>;

    /// Inserts a new message or replaces an existing one with the same id
    fn write_message(&mut self, message: ChatMessage) -> StoreResult<()>;

    /// Applies every write made through this transaction
    fn commit(self: Box<Self>) -> StoreResult<()>;
}
