//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name               | Description                                       | Key Methods        |
// |--------------------|---------------------------------------------------|--------------------|
// | MemoryStore        | In-memory draft state behind one lock             | new, begin         |
// | MemoryTransaction  | Staged writes, applied on commit                  | commit             |
//--------------------------------------------------------------------------------------------------

use parking_lot::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

use crate::domain::models::{ChatMessage, DraftState, Player, RosterEntry, Team, TeamRef};
use crate::domain::services::state_store::{
    StateStore, StoreError, StoreResult, StoreTransaction,
};

/// In-memory state store.
///
/// A transaction holds the store lock from `begin` until it is committed or dropped, so
/// transactions never interleave. Player and team lists are copied on their first write in a
/// transaction; chat writes are kept as a list of upserts, so the growing chat history is never
/// copied by a write. Dropping the transaction leaves the stored state untouched.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<DraftState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: DraftState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    /// Copy of the committed state
    pub fn state(&self) -> DraftState {
        self.state.lock().clone()
    }
}

impl StateStore for MemoryStore {
    fn begin(&self) -> StoreResult<Box<dyn StoreTransaction + '_>> {
        Ok(Box::new(MemoryTransaction {
            guard: self.state.lock(),
            players: None,
            teams: None,
            message_writes: Vec::new(),
        }))
    }
}

struct MemoryTransaction<'a> {
    guard: MutexGuard<'a, DraftState>,
    /// Working copies, present once the transaction wrote to them
    players: Option<Vec<Player>>,
    teams: Option<Vec<Team>>,
    /// Inserted or replaced messages, in write order
    message_writes: Vec<ChatMessage>,
}

/// Replaces the message with the same id, or appends it
fn upsert_message(messages: &mut Vec<ChatMessage>, message: ChatMessage) {
    match messages.iter_mut().rev().find(|m| m.id == message.id) {
        Some(existing) => *existing = message,
        None => messages.push(message),
    }
}

impl MemoryTransaction<'_> {
    fn staged_players(&self) -> &[Player] {
        self.players.as_deref().unwrap_or(&self.guard.players)
    }

    fn staged_teams(&self) -> &[Team] {
        self.teams.as_deref().unwrap_or(&self.guard.teams)
    }

    fn players_mut(&mut self) -> &mut Vec<Player> {
        let MemoryTransaction { guard, players, .. } = self;
        players.get_or_insert_with(|| guard.players.clone())
    }

    fn teams_mut(&mut self) -> &mut Vec<Team> {
        let MemoryTransaction { guard, teams, .. } = self;
        teams.get_or_insert_with(|| guard.teams.clone())
    }

    fn player_mut(&mut self, id: Uuid) -> StoreResult<&mut Player> {
        self.players_mut()
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::MissingRecord(format!("player {}", id)))
    }

    fn team_mut(&mut self, id: Uuid) -> StoreResult<&mut Team> {
        self.teams_mut()
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::MissingRecord(format!("team {}", id)))
    }
}

impl StoreTransaction for MemoryTransaction<'_> {
    fn read_player(&self, id: Uuid) -> StoreResult<Option<Player>> {
        Ok(self.staged_players().iter().find(|p| p.id == id).cloned())
    }

    fn read_team(&self, id: Uuid) -> StoreResult<Option<Team>> {
        Ok(self.staged_teams().iter().find(|t| t.id == id).cloned())
    }

    fn read_message(&self, id: Uuid) -> StoreResult<Option<ChatMessage>> {
        let staged = self.message_writes.iter().rev().find(|m| m.id == id);
        Ok(staged
            .or_else(|| self.guard.messages.iter().find(|m| m.id == id))
            .cloned())
    }

    fn players(&self) -> StoreResult<Vec<Player>> {
        Ok(self.staged_players().to_vec())
    }

    fn teams(&self) -> StoreResult<Vec<Team>> {
        Ok(self.staged_teams().to_vec())
    }

    fn messages(&self) -> StoreResult<Vec<ChatMessage>> {
        let mut messages = self.guard.messages.clone();
        for message in &self.message_writes {
            upsert_message(&mut messages, message.clone());
        }
        Ok(messages)
    }

    fn count_drafted(&self) -> StoreResult<u32> {
        let drafted = self.staged_players().iter().filter(|p| p.drafted).count();
        Ok(drafted as u32)
    }

    fn write_drafted_player(
        &mut self,
        id: Uuid,
        team: &TeamRef,
        new_score: i32,
    ) -> StoreResult<()> {
        let player = self.player_mut(id)?;
        player.drafted = true;
        player.drafted_by = Some(team.clone());
        player.adjustable_score = new_score;
        Ok(())
    }

    fn append_roster_entry(&mut self, team_id: Uuid, entry: RosterEntry) -> StoreResult<()> {
        self.team_mut(team_id)?.roster.push(entry);
        Ok(())
    }

    fn append_system_message(&mut self, text: &str) -> StoreResult<ChatMessage> {
        let message = ChatMessage::system(text);
        self.message_writes.push(message.clone());
        Ok(message)
    }

    fn write_player(&mut self, player: Player) -> StoreResult<()> {
        let players = self.players_mut();
        match players.iter_mut().find(|p| p.id == player.id) {
            Some(existing) => *existing = player,
            None => players.push(player),
        }
        Ok(())
    }

    fn write_team(&mut self, team: Team) -> StoreResult<()> {
        let teams = self.teams_mut();
        match teams.iter_mut().find(|t| t.id == team.id) {
            Some(existing) => *existing = team,
            None => teams.push(team),
        }
        Ok(())
    }

    fn write_team_order(&mut self, order: &[Uuid]) -> StoreResult<()> {
        let teams = self.teams_mut();
        if order.len() != teams.len() {
            return Err(StoreError::MissingRecord(format!(
                "team order names {} teams, store has {}",
                order.len(),
                teams.len()
            )));
        }
        let mut remaining = teams.clone();
        let mut reordered = Vec::with_capacity(order.len());
        for id in order {
            let position = remaining
                .iter()
                .position(|t| t.id == *id)
                .ok_or_else(|| StoreError::MissingRecord(format!("team {}", id)))?;
            reordered.push(remaining.swap_remove(position));
        }
        *teams = reordered;
        Ok(())
    }

    fn write_message(&mut self, message: ChatMessage) -> StoreResult<()> {
        self.message_writes.push(message);
        Ok(())
    }

    fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTransaction {
            mut guard,
            players,
            teams,
            message_writes,
        } = *self;
        if let Some(players) = players {
            guard.players = players;
        }
        if let Some(teams) = teams {
            guard.teams = teams;
        }
        for message in message_writes {
            upsert_message(&mut guard.messages, message);
        }
        debug!("state store transaction committed");
        Ok(())
    }
}
