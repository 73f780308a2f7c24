//! Database models and their mapping to play events.

use chrono::{NaiveDateTime, TimeZone, Utc};
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use scorecard_engine::{Analytics, BaseState, ClientKey, EventId, EventType, Half, PlayEvent};
use tracing::instrument;

use crate::db::{DbError, schema};

/// Stored play row.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::plays)]
pub struct PlayRow {
    id: i64,
    client_key: String,
    game_id: String,
    recorded_at: NaiveDateTime,
    inning: i32,
    half: String,
    batter_id: String,
    event_type: String,
    rbi: i32,
    runs: Option<i32>,
    outs_on_play: i32,
    base_state_after: String,
    analytics: String,
    description: String,
}

impl PlayRow {
    /// Converts the row into a confirmed play event.
    ///
    /// Unknown event type names load as [`EventType::Unrecognized`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] when a column holds a value the event model
    /// cannot represent.
    #[instrument(skip(self), fields(id = self.id, event_type = %self.event_type))]
    pub fn into_event(self) -> Result<PlayEvent, DbError> {
        let analytics: Analytics = if self.analytics.trim().is_empty() {
            Analytics::default()
        } else {
            serde_json::from_str(&self.analytics)?
        };
        Ok(PlayEvent {
            id: Some(EventId::from(self.id)),
            client_key: self.client_key.parse::<ClientKey>()?,
            game_id: self.game_id,
            recorded_at: Utc.from_utc_datetime(&self.recorded_at),
            inning: non_negative(self.inning, "inning")?,
            half: self.half.parse::<Half>()?,
            batter_id: self.batter_id.into(),
            event_type: EventType::parse(&self.event_type),
            rbi: non_negative(self.rbi, "rbi")?,
            runs: self.runs.map(|r| non_negative(r, "runs")).transpose()?,
            outs_on_play: u8::try_from(self.outs_on_play)
                .map_err(|_| DbError::new(format!("Invalid outs_on_play: {}", self.outs_on_play)))?,
            base_state_after: BaseState::decode(&self.base_state_after)?,
            analytics,
            description: self.description,
        })
    }
}

fn non_negative(value: i32, column: &str) -> Result<u32, DbError> {
    u32::try_from(value).map_err(|_| DbError::new(format!("Negative {}: {}", column, value)))
}

fn to_column(value: u32, column: &str) -> Result<i32, DbError> {
    i32::try_from(value).map_err(|_| DbError::new(format!("{} out of range: {}", column, value)))
}

/// Insertable play row.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::plays)]
pub struct NewPlayRow {
    client_key: String,
    game_id: String,
    recorded_at: NaiveDateTime,
    inning: i32,
    half: String,
    batter_id: String,
    event_type: String,
    rbi: i32,
    runs: Option<i32>,
    outs_on_play: i32,
    base_state_after: String,
    analytics: String,
    description: String,
}

impl NewPlayRow {
    /// Builds the row for an unconfirmed play event. Any id on the event is
    /// ignored; the database assigns one.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] when a count does not fit its column.
    #[instrument(skip(event), fields(client_key = %event.client_key, event_type = %event.event_type))]
    pub fn from_event(event: &PlayEvent) -> Result<Self, DbError> {
        Ok(Self::new(
            event.client_key.to_string(),
            event.game_id.clone(),
            event.recorded_at.naive_utc(),
            to_column(event.inning, "inning")?,
            event.half.label().to_string(),
            event.batter_id.to_string(),
            event.event_type.as_str().to_string(),
            to_column(event.rbi, "rbi")?,
            event.runs.map(|r| to_column(r, "runs")).transpose()?,
            i32::from(event.outs_on_play),
            event.base_state_after.encode(),
            serde_json::to_string(&event.analytics)?,
            event.description.clone(),
        ))
    }
}

/// Per-game row holding the opponent's score.
#[derive(Debug, Clone, Queryable, Selectable, Getters)]
#[diesel(table_name = schema::games)]
pub struct GameRow {
    game_id: String,
    opponent_score: i32,
    updated_at: NaiveDateTime,
}

/// Upsert for the opponent's score.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::games)]
pub struct GameScoreUpdate {
    game_id: String,
    opponent_score: i32,
    updated_at: NaiveDateTime,
}
