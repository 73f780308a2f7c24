//! Database repository for play events and per-game opponent scores.

use chrono::Utc;
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use scorecard_engine::{EventId, PlayEvent};
use tracing::{debug, info, instrument, warn};

use crate::db::{DbError, GameRow, GameScoreUpdate, NewPlayRow, PlayRow, schema};

/// Migrations compiled into the binary.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Database repository for play operations.
#[derive(Debug, Clone)]
pub struct PlayRepository {
    db_path: String,
}

impl PlayRepository {
    /// Creates a new repository for the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the path is empty.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn new(db_path: String) -> Result<Self, DbError> {
        if db_path.trim().is_empty() {
            return Err(DbError::new("Database path is empty"));
        }
        info!(path = %db_path, "Creating PlayRepository");
        Ok(Self { db_path })
    }

    /// Path of the database file.
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// Establishes a database connection.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        SqliteConnection::establish(&self.db_path)
            .map_err(|e| DbError::new(format!("Failed to connect to '{}': {}", self.db_path, e)))
    }

    /// Applies pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a migration fails.
    #[instrument(skip(self))]
    pub fn migrate(&self) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| DbError::new(format!("Migration failed: {}", e)))?;
        info!(count = applied.len(), "Migrations applied");
        Ok(())
    }

    /// Inserts a play and returns the stored copy with its id.
    ///
    /// Inserting a play whose client key is already stored returns the stored
    /// copy instead of a duplicate.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self, event), fields(game_id = %event.game_id, client_key = %event.client_key))]
    pub fn insert_play(&self, event: &PlayEvent) -> Result<PlayEvent, DbError> {
        debug!("Inserting play");
        let mut conn = self.connection()?;
        let client_key = event.client_key.to_string();

        let existing = schema::plays::table
            .filter(schema::plays::client_key.eq(&client_key))
            .select(PlayRow::as_select())
            .first::<PlayRow>(&mut conn)
            .optional()?;
        if let Some(row) = existing {
            debug!(id = row.id(), "Play already stored");
            return row.into_event();
        }

        let row = diesel::insert_into(schema::plays::table)
            .values(&NewPlayRow::from_event(event)?)
            .returning(PlayRow::as_returning())
            .get_result(&mut conn)?;

        info!(id = row.id(), event_type = %row.event_type(), "Play stored");
        row.into_event()
    }

    /// Deletes a play. Returns false when no play has that id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn delete_play(&self, game_id: &str, id: EventId) -> Result<bool, DbError> {
        let mut conn = self.connection()?;
        let deleted = diesel::delete(
            schema::plays::table
                .filter(schema::plays::id.eq(id.get()))
                .filter(schema::plays::game_id.eq(game_id)),
        )
        .execute(&mut conn)?;

        if deleted == 0 {
            warn!(%id, "No play to delete");
            Ok(false)
        } else {
            info!(%id, "Play deleted");
            Ok(true)
        }
    }

    /// Lists the plays of a game in log order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs or a row is malformed.
    #[instrument(skip(self))]
    pub fn list_plays(&self, game_id: &str) -> Result<Vec<PlayEvent>, DbError> {
        debug!("Loading plays");
        let mut conn = self.connection()?;

        let rows = schema::plays::table
            .filter(schema::plays::game_id.eq(game_id))
            .order((
                schema::plays::recorded_at.asc(),
                schema::plays::client_key.asc(),
            ))
            .select(PlayRow::as_select())
            .load::<PlayRow>(&mut conn)?;

        let plays = rows
            .into_iter()
            .map(PlayRow::into_event)
            .collect::<Result<Vec<_>, _>>()?;
        info!(count = plays.len(), "Plays loaded");
        Ok(plays)
    }

    /// Stores the opponent's score for a game, replacing any earlier value.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn set_opponent_score(&self, game_id: &str, score: u32) -> Result<(), DbError> {
        let score = i32::try_from(score)
            .map_err(|_| DbError::new(format!("Opponent score out of range: {}", score)))?;
        let now = Utc::now().naive_utc();
        let mut conn = self.connection()?;

        diesel::insert_into(schema::games::table)
            .values(&GameScoreUpdate::new(game_id.to_string(), score, now))
            .on_conflict(schema::games::game_id)
            .do_update()
            .set((
                schema::games::opponent_score.eq(score),
                schema::games::updated_at.eq(now),
            ))
            .execute(&mut conn)?;

        info!(score, "Opponent score stored");
        Ok(())
    }

    /// Loads the opponent's score for a game; zero when never set.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn opponent_score(&self, game_id: &str) -> Result<u32, DbError> {
        let mut conn = self.connection()?;
        let row = schema::games::table
            .filter(schema::games::game_id.eq(game_id))
            .select(GameRow::as_select())
            .first::<GameRow>(&mut conn)
            .optional()?;

        match row {
            Some(row) => u32::try_from(*row.opponent_score()).map_err(|_| {
                DbError::new(format!("Negative opponent score: {}", row.opponent_score()))
            }),
            None => {
                debug!("No score stored for game");
                Ok(0)
            }
        }
    }
}
