//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name          | Description                                          | Key Methods         |
// |---------------|------------------------------------------------------|---------------------|
// | DraftEngine   | Transactional draft rules on top of a state store    | draft_player        |
// |               |                                                      | reset_draft         |
// |               |                                                      | snapshot            |
// |               |                                                      | add_reaction        |
//--------------------------------------------------------------------------------------------------

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::models::types::STARTING_ADJUSTABLE_SCORE;
use crate::domain::models::{
    ChatMessage, DraftPick, DraftSnapshot, NewMessage, NewPlayer, NewTeam, Player, RosterEntry,
    Team,
};
use crate::domain::services::events::{DraftEvent, EventHub};
use crate::domain::services::state_store::StateStore;

use super::scoring;
use super::{DraftError, DraftService};

/// The only writer of draft state.
///
/// Each operation opens one store transaction, applies the draft rules inside it and commits.
/// The matching event is published after the commit succeeds; a failed or abandoned transaction
/// publishes nothing.
pub struct DraftEngine {
    store: Arc<dyn StateStore>,
    events: Arc<dyn EventHub>,
}

impl DraftEngine {
    pub fn new(store: Arc<dyn StateStore>, events: Arc<dyn EventHub>) -> Self {
        Self { store, events }
    }

    /// Publishes after a commit. The change is already durable, so a failed publish is only
    /// logged; subscribers resynchronize from the next event or a state read.
    fn emit(&self, event: DraftEvent) {
        let kind = event.kind();
        match self.events.publish(event) {
            Ok(()) => debug!("published {}", kind),
            Err(err) => warn!("committed change but failed to publish {}: {}", kind, err),
        }
    }

    fn require(value: &str, field: &str) -> Result<(), DraftError> {
        if value.trim().is_empty() {
            return Err(DraftError::Validation(format!("{} must not be empty", field)));
        }
        Ok(())
    }
}

impl DraftService for DraftEngine {
    fn draft_player(&self, player_id: Uuid, team_id: Uuid) -> Result<DraftPick, DraftError> {
        let mut tx = self.store.begin()?;

        let player = tx
            .read_player(player_id)?
            .ok_or(DraftError::PlayerNotFound(player_id))?;
        if player.drafted {
            return Err(DraftError::AlreadyDrafted(player_id));
        }
        let team = tx
            .read_team(team_id)?
            .ok_or(DraftError::TeamNotFound(team_id))?;

        // Counted inside the transaction so two pickers can never share a pick number
        let pick_number = tx.count_drafted()? + 1;
        let adjustment = scoring::pick_adjustment(pick_number);
        let new_score = scoring::adjusted_score(player.adjustable_score, pick_number);
        let team_ref = team.team_ref();

        tx.write_drafted_player(player.id, &team_ref, new_score)?;
        tx.append_roster_entry(
            team.id,
            RosterEntry {
                player_id: player.id,
                player_name: player.name.clone(),
                pick_number,
            },
        )?;
        let announcement = tx.append_system_message(&format!(
            "Pick {}: {} {} selects {} ({} → {})",
            pick_number, team.marker, team.name, player.name, player.adjustable_score, new_score
        ))?;
        tx.commit()?;

        info!(
            "Pick {}: player {} to team {} (score {} -> {})",
            pick_number, player.id, team.id, player.adjustable_score, new_score
        );
        self.emit(DraftEvent::PlayerDrafted {
            player_id: player.id,
            team_id: team.id,
            pick_number,
        });

        let previous_score = player.adjustable_score;
        let drafted = Player {
            adjustable_score: new_score,
            drafted: true,
            drafted_by: Some(team_ref.clone()),
            ..player
        };
        Ok(DraftPick {
            pick_number,
            player: drafted,
            team: team_ref,
            previous_score,
            adjustment,
            announcement: announcement.id,
        })
    }

    fn reset_draft(&self) -> Result<(), DraftError> {
        let mut tx = self.store.begin()?;

        for player in tx.players()? {
            tx.write_player(Player {
                adjustable_score: STARTING_ADJUSTABLE_SCORE,
                drafted: false,
                drafted_by: None,
                ..player
            })?;
        }
        for team in tx.teams()? {
            tx.write_team(Team {
                roster: Vec::new(),
                ..team
            })?;
        }
        tx.append_system_message("The draft has been reset")?;
        tx.commit()?;

        info!("Draft reset");
        self.emit(DraftEvent::DraftReset {});
        Ok(())
    }

    fn snapshot(&self) -> Result<DraftSnapshot, DraftError> {
        let tx = self.store.begin()?;
        let players = tx.players()?;
        let teams = tx.teams()?;
        let total_drafted = tx.count_drafted()?;
        drop(tx);

        let on_the_clock = scoring::team_on_the_clock(total_drafted, teams.len())
            .and_then(|index| teams.get(index))
            .map(Team::team_ref);

        Ok(DraftSnapshot {
            round: scoring::current_round(total_drafted, teams.len()),
            next_pick: total_drafted + 1,
            total_drafted,
            on_the_clock,
            players,
            teams,
        })
    }

    fn add_team(&self, input: NewTeam) -> Result<Team, DraftError> {
        Self::require(&input.name, "team name")?;
        let team = Team::new(input);

        let mut tx = self.store.begin()?;
        tx.write_team(team.clone())?;
        tx.commit()?;

        info!("Team {} added: {}", team.id, team.name);
        self.emit(DraftEvent::TeamAdded { team_id: team.id });
        Ok(team)
    }

    fn reorder_teams(&self, order: Vec<Uuid>) -> Result<Vec<Team>, DraftError> {
        let mut tx = self.store.begin()?;
        let teams = tx.teams()?;

        let current: HashSet<Uuid> = teams.iter().map(|t| t.id).collect();
        let requested: HashSet<Uuid> = order.iter().copied().collect();
        if order.len() != teams.len() || requested.len() != order.len() {
            return Err(DraftError::Validation(format!(
                "team order must list each of the {} teams exactly once",
                teams.len()
            )));
        }
        if let Some(unknown) = order.iter().find(|id| !current.contains(id)) {
            return Err(DraftError::TeamNotFound(*unknown));
        }

        tx.write_team_order(&order)?;
        let reordered = tx.teams()?;
        tx.commit()?;

        info!("Team order changed");
        self.emit(DraftEvent::TeamOrderChanged { team_ids: order });
        Ok(reordered)
    }

    fn add_player(&self, input: NewPlayer) -> Result<Player, DraftError> {
        Self::require(&input.name, "player name")?;
        let player = Player::new(input);

        let mut tx = self.store.begin()?;
        tx.write_player(player.clone())?;
        tx.commit()?;

        debug!("Player {} added: {}", player.id, player.name);
        self.emit(DraftEvent::PlayerAdded {
            player_id: player.id,
        });
        Ok(player)
    }

    fn set_player_score(&self, player_id: Uuid, score: i32) -> Result<Player, DraftError> {
        let mut tx = self.store.begin()?;
        let player = tx
            .read_player(player_id)?
            .ok_or(DraftError::PlayerNotFound(player_id))?;

        let updated = Player {
            popularity: score,
            ..player
        };
        tx.write_player(updated.clone())?;
        tx.commit()?;

        self.emit(DraftEvent::ScoreUpdated { player_id, score });
        Ok(updated)
    }

    fn add_message(&self, input: NewMessage) -> Result<ChatMessage, DraftError> {
        Self::require(&input.author, "author")?;
        Self::require(&input.text, "message text")?;
        let message = ChatMessage::user(input);

        let mut tx = self.store.begin()?;
        tx.write_message(message.clone())?;
        tx.commit()?;

        self.emit(DraftEvent::ChatMessageAdded {
            message_id: message.id,
        });
        Ok(message)
    }

    fn add_reaction(
        &self,
        message_id: Uuid,
        emoji: &str,
        user: &str,
    ) -> Result<ChatMessage, DraftError> {
        Self::require(emoji, "emoji")?;
        Self::require(user, "user")?;

        let mut tx = self.store.begin()?;
        let mut message = tx
            .read_message(message_id)?
            .ok_or(DraftError::MessageNotFound(message_id))?;

        if !message.react(emoji, user) {
            debug!("{} already reacted {} to {}", user, emoji, message_id);
            return Ok(message);
        }
        tx.write_message(message.clone())?;
        tx.commit()?;

        self.emit(DraftEvent::ChatReactionAdded {
            message_id,
            emoji: emoji.to_string(),
            count: message.reaction_count(emoji),
        });
        Ok(message)
    }

    fn messages(&self) -> Result<Vec<ChatMessage>, DraftError> {
        let tx = self.store.begin()?;
        Ok(tx.messages()?)
    }
}
