//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name          | Description                                       | Key Methods          |
// |---------------|---------------------------------------------------|----------------------|
// | Player        | Draftable player with scores and draft status     | new, team_ref        |
// | Team          | Draft participant with an append-only roster      | new                  |
// | TeamRef       | Identifier/name pair recorded on drafted players  |                      |
// | RosterEntry   | One drafted player on a team roster               |                      |
// | ChatMessage   | Chat line, user-written or generated by the draft | user, system, react  |
// | Reaction      | Emoji reaction with the users who left it         |                      |
// | NewPlayer     | Input for registering a player                    |                      |
// | NewTeam       | Input for registering a team                      |                      |
// | NewMessage    | Input for posting a chat message                  |                      |
//--------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Adjustable score every player starts with, and returns to on reset
pub const STARTING_ADJUSTABLE_SCORE: i32 = 50;

/// Lower bound of the adjustable score
pub const MIN_ADJUSTABLE_SCORE: i32 = 10;

/// Upper bound of the adjustable score
pub const MAX_ADJUSTABLE_SCORE: i32 = 100;

/// Identifier and display name of the team that drafted a player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRef {
    pub id: Uuid,
    pub name: String,
}

/// A draftable player.
///
/// `drafted == true` always comes with `drafted_by`; a drafted player only becomes undrafted
/// again through a full draft reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: Uuid,
    pub name: String,
    pub role: String,
    pub group: String,
    pub tier: String,
    /// Popularity score, overwritten by external score updates
    pub popularity: i32,
    /// Score moved only by the pick formula, kept within [10, 100]
    pub adjustable_score: i32,
    pub drafted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drafted_by: Option<TeamRef>,
}

impl Player {
    pub fn new(input: NewPlayer) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            role: input.role,
            group: input.group,
            tier: input.tier,
            popularity: input.popularity,
            adjustable_score: STARTING_ADJUSTABLE_SCORE,
            drafted: false,
            drafted_by: None,
        }
    }
}

/// One drafted player on a roster. Roster order is pick order for that team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub player_id: Uuid,
    pub player_name: String,
    pub pick_number: u32,
}

/// A team taking part in the draft
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub owner: String,
    /// Decorative marker shown next to the team name (usually an emoji)
    pub marker: String,
    pub roster: Vec<RosterEntry>,
}

impl Team {
    pub fn new(input: NewTeam) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            owner: input.owner,
            marker: input.marker,
            roster: Vec::new(),
        }
    }

    pub fn team_ref(&self) -> TeamRef {
        TeamRef {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// An emoji reaction on a chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub emoji: String,
    pub users: Vec<String>,
}

impl Reaction {
    pub fn count(&self) -> usize {
        self.users.len()
    }
}

/// A chat line in the draft room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub author: String,
    pub text: String,
    /// Set on messages generated by the draft itself
    pub system: bool,
    pub created_at: DateTime<Utc>,
    pub reactions: Vec<Reaction>,
}

impl ChatMessage {
    /// Author recorded on generated messages
    pub const SYSTEM_AUTHOR: &'static str = "draft";

    pub fn user(input: NewMessage) -> Self {
        Self {
            id: Uuid::new_v4(),
            author: input.author,
            text: input.text,
            system: false,
            created_at: Utc::now(),
            reactions: Vec::new(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            author: Self::SYSTEM_AUTHOR.to_string(),
            text: text.into(),
            system: true,
            created_at: Utc::now(),
            reactions: Vec::new(),
        }
    }

    /// Records `user` reacting with `emoji`.
    ///
    /// Returns `false` when that user already left that reaction, in which case nothing changes.
    pub fn react(&mut self, emoji: &str, user: &str) -> bool {
        match self.reactions.iter_mut().find(|r| r.emoji == emoji) {
            Some(reaction) if reaction.users.iter().any(|u| u == user) => false,
            Some(reaction) => {
                reaction.users.push(user.to_string());
                true
            }
            None => {
                self.reactions.push(Reaction {
                    emoji: emoji.to_string(),
                    users: vec![user.to_string()],
                });
                true
            }
        }
    }

    pub fn reaction_count(&self, emoji: &str) -> usize {
        self.reactions
            .iter()
            .find(|r| r.emoji == emoji)
            .map_or(0, Reaction::count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPlayer {
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub tier: String,
    #[serde(default)]
    pub popularity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTeam {
    pub name: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub marker: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub author: String,
    pub text: String,
}
