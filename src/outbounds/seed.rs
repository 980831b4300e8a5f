use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::domain::models::{NewPlayer, NewTeam};
use crate::domain::services::draft_engine::{DraftError, DraftService};

/// Errors while loading or applying a seed file
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read seed file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse seed file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("Failed to apply seed: {0}")]
    Apply(#[from] DraftError),
}

/// Initial teams and players, loaded at startup.
///
/// ```json
/// { "teams": [{ "name": "Dragons", "owner": "ana", "marker": "🐉" }],
///   "players": [{ "name": "Faker", "role": "mid", "group": "T1", "tier": "S", "popularity": 97 }] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub teams: Vec<NewTeam>,
    #[serde(default)]
    pub players: Vec<NewPlayer>,
}

impl Seed {
    pub fn load(path: &Path) -> Result<Self, SeedError> {
        let display = path.display().to_string();
        let raw = fs::read_to_string(path).map_err(|source| SeedError::Read {
            path: display.clone(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| SeedError::Parse {
            path: display,
            source,
        })
    }

    /// Registers every team and player through the draft service, so each one publishes its
    /// event like any other addition.
    pub fn apply(self, draft: &dyn DraftService) -> Result<(usize, usize), SeedError> {
        let teams = self.teams.len();
        let players = self.players.len();
        for team in self.teams {
            draft.add_team(team)?;
        }
        for player in self.players {
            draft.add_player(player)?;
        }
        info!("Seeded {} teams and {} players", teams, players);
        Ok((teams, players))
    }
}
