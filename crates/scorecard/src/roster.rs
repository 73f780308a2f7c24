//! Batting lineup collaborator.

use crate::store::StoreError;
use async_trait::async_trait;
use scorecard_engine::RosterId;
use tracing::{debug, instrument};

/// Source of a game's batting order.
#[async_trait]
pub trait Roster: Send + Sync {
    /// Batting order for the game, leadoff first.
    async fn batting_lineup(&self, game_id: &str) -> Result<Vec<RosterId>, StoreError>;
}

/// A lineup fixed at startup, the same for every game.
#[derive(Debug, Clone, Default, PartialEq, Eq, derive_new::new)]
pub struct FixedLineup {
    players: Vec<RosterId>,
}

impl FixedLineup {
    /// Builds a lineup from player ids, skipping blank entries.
    pub fn from_names<I, T>(names: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let players = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_string())
            .filter(|n| !n.is_empty())
            .map(RosterId::new)
            .collect();
        Self { players }
    }

    /// The players in batting order.
    pub fn players(&self) -> &[RosterId] {
        &self.players
    }
}

#[async_trait]
impl Roster for FixedLineup {
    #[instrument(skip(self))]
    async fn batting_lineup(&self, game_id: &str) -> Result<Vec<RosterId>, StoreError> {
        debug!(count = self.players.len(), "Serving fixed lineup");
        Ok(self.players.clone())
    }
}
