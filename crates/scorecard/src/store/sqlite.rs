//! SQLite-backed play store.

use super::{PlayStore, StoreError};
use crate::db::{DbError, PlayRepository};
use async_trait::async_trait;
use scorecard_engine::{EventId, PlayEvent};
use tracing::{info, instrument};

/// Play store on a SQLite file, running queries on the blocking pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    repository: PlayRepository,
}

impl SqliteStore {
    /// Opens the database at `db_path` and applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the path is invalid or a migration fails.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn open(db_path: String) -> Result<Self, DbError> {
        let repository = PlayRepository::new(db_path)?;
        repository.migrate()?;
        info!("SQLite store ready");
        Ok(Self { repository })
    }

    /// Wraps an existing repository without running migrations.
    pub fn from_repository(repository: PlayRepository) -> Self {
        Self { repository }
    }

    /// The underlying repository.
    pub fn repository(&self) -> &PlayRepository {
        &self.repository
    }

    async fn blocking<T, F>(&self, work: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(PlayRepository) -> Result<T, StoreError> + Send + 'static,
    {
        let repository = self.repository.clone();
        tokio::task::spawn_blocking(move || work(repository))
            .await
            .map_err(|e| StoreError::Unavailable(format!("Database task failed: {}", e)))?
    }
}

#[async_trait]
impl PlayStore for SqliteStore {
    #[instrument(skip(self, play), fields(game_id = %play.game_id, client_key = %play.client_key))]
    async fn append_event(&self, play: &PlayEvent) -> Result<PlayEvent, StoreError> {
        let play = play.clone();
        self.blocking(move |repo| Ok(repo.insert_play(&play)?)).await
    }

    #[instrument(skip(self))]
    async fn delete_event(&self, game_id: &str, id: EventId) -> Result<(), StoreError> {
        let game_id = game_id.to_string();
        self.blocking(move |repo| {
            if repo.delete_play(&game_id, id)? {
                Ok(())
            } else {
                Err(StoreError::NotFound(id))
            }
        })
        .await
    }

    #[instrument(skip(self))]
    async fn list_events(&self, game_id: &str) -> Result<Vec<PlayEvent>, StoreError> {
        let game_id = game_id.to_string();
        self.blocking(move |repo| Ok(repo.list_plays(&game_id)?)).await
    }

    #[instrument(skip(self))]
    async fn set_opponent_score(&self, game_id: &str, score: u32) -> Result<(), StoreError> {
        let game_id = game_id.to_string();
        self.blocking(move |repo| Ok(repo.set_opponent_score(&game_id, score)?))
            .await
    }

    #[instrument(skip(self))]
    async fn opponent_score(&self, game_id: &str) -> Result<u32, StoreError> {
        let game_id = game_id.to_string();
        self.blocking(move |repo| Ok(repo.opponent_score(&game_id)?)).await
    }
}
