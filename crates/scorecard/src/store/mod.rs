//! Persistence collaborator for the play log.
//!
//! The live game only talks to [`PlayStore`]; [`MemoryStore`] and
//! [`SqliteStore`] are the two backends shipped with the crate.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::db::DbError;
use async_trait::async_trait;
use scorecard_engine::{EventId, PlayEvent};

/// Error from a persistence collaborator.
#[derive(Debug, Clone, derive_more::Display)]
pub enum StoreError {
    /// The store cannot be reached.
    #[display("Store unavailable: {}", _0)]
    Unavailable(String),

    /// No play with this id exists.
    #[display("Play {} not found", _0)]
    NotFound(EventId),

    /// The database rejected the operation.
    #[display("{}", _0)]
    Database(DbError),
}

impl std::error::Error for StoreError {}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        Self::Database(err)
    }
}

/// Log storage for play events.
#[async_trait]
pub trait PlayStore: Send + Sync {
    /// Persists an unconfirmed play and returns it with its assigned id.
    ///
    /// Appending a play whose client key is already stored returns the
    /// stored copy.
    async fn append_event(&self, play: &PlayEvent) -> Result<PlayEvent, StoreError>;

    /// Deletes a play.
    async fn delete_event(&self, game_id: &str, id: EventId) -> Result<(), StoreError>;

    /// Lists every play of a game in log order.
    async fn list_events(&self, game_id: &str) -> Result<Vec<PlayEvent>, StoreError>;

    /// Stores the opponent's score; the last write wins.
    async fn set_opponent_score(&self, game_id: &str, score: u32) -> Result<(), StoreError>;

    /// Loads the opponent's score; zero when never set.
    async fn opponent_score(&self, game_id: &str) -> Result<u32, StoreError>;
}
