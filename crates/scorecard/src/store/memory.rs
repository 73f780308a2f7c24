//! In-process play store.

use super::{PlayStore, StoreError};
use async_trait::async_trait;
use scorecard_engine::{EventId, GameId, PlayEvent};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    plays: BTreeMap<EventId, PlayEvent>,
    opponent_scores: HashMap<GameId, u32>,
    offline: bool,
}

/// Play store held in memory, shared between clones.
///
/// Ids are assigned sequentially from 1. The offline switch makes every call
/// fail with [`StoreError::Unavailable`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[instrument]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates losing (or regaining) the connection to the store.
    #[instrument(skip(self))]
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
        info!(offline, "Memory store availability changed");
    }

    /// Number of stored plays across all games.
    pub fn len(&self) -> usize {
        self.lock().plays.len()
    }

    /// True when no plays are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn online(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        let guard = self.lock();
        if guard.offline {
            warn!("Memory store is offline");
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }
        Ok(guard)
    }
}

#[async_trait]
impl PlayStore for MemoryStore {
    #[instrument(skip(self, play), fields(game_id = %play.game_id, client_key = %play.client_key))]
    async fn append_event(&self, play: &PlayEvent) -> Result<PlayEvent, StoreError> {
        let mut inner = self.online()?;
        if let Some(existing) = inner.plays.values().find(|p| p.client_key == play.client_key) {
            debug!("Play already stored");
            return Ok(existing.clone());
        }
        inner.next_id += 1;
        let id = EventId::from(inner.next_id);
        let mut stored = play.clone();
        stored.id = Some(id);
        inner.plays.insert(id, stored.clone());
        info!(%id, "Play stored");
        Ok(stored)
    }

    #[instrument(skip(self))]
    async fn delete_event(&self, game_id: &str, id: EventId) -> Result<(), StoreError> {
        let mut inner = self.online()?;
        let belongs = inner.plays.get(&id).is_some_and(|p| p.game_id == game_id);
        if !belongs {
            return Err(StoreError::NotFound(id));
        }
        inner.plays.remove(&id);
        info!(%id, "Play deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_events(&self, game_id: &str) -> Result<Vec<PlayEvent>, StoreError> {
        let inner = self.online()?;
        let mut plays: Vec<PlayEvent> = inner
            .plays
            .values()
            .filter(|p| p.game_id == game_id)
            .cloned()
            .collect();
        plays.sort_by_key(PlayEvent::sort_key);
        debug!(count = plays.len(), "Plays listed");
        Ok(plays)
    }

    #[instrument(skip(self))]
    async fn set_opponent_score(&self, game_id: &str, score: u32) -> Result<(), StoreError> {
        let mut inner = self.online()?;
        inner.opponent_scores.insert(game_id.to_string(), score);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn opponent_score(&self, game_id: &str) -> Result<u32, StoreError> {
        let inner = self.online()?;
        Ok(inner.opponent_scores.get(game_id).copied().unwrap_or(0))
    }
}
