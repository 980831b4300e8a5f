pub mod snapshot;
pub mod types;

pub use snapshot::{DraftPick, DraftSnapshot, DraftState};
pub use types::{
    ChatMessage, NewMessage, NewPlayer, NewTeam, Player, Reaction, RosterEntry, Team, TeamRef,
};
