//! Play events: the append-only record of one plate appearance.
//!
//! Events are domain facts, not side effects. They are created once from an
//! advancement outcome, confirmed by persistence, and only ever removed by
//! undo.

use crate::advancement::PlayOutcome;
use crate::types::{BaseState, Half, HalfInning, RosterId};
use crate::zone::FieldZone;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::str::FromStr;
use tracing::instrument;

/// Identifier of a game.
pub type GameId = String;

/// Identifier assigned to an event by persistence.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct EventId(i64);

impl EventId {
    /// Returns the raw id value.
    pub fn get(self) -> i64 {
        self.0
    }
}

/// Idempotency key generated when an event is first recorded locally.
///
/// Persistence echoes it back so the optimistic copy is replaced instead of
/// duplicated.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct ClientKey(uuid::Uuid);

impl ClientKey {
    /// Generates a fresh random key.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl FromStr for ClientKey {
    type Err = crate::types::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| crate::types::ParseError::new(format!("Invalid client key '{}': {}", s, e)))
    }
}

/// Outcome type of a plate appearance.
///
/// Unknown names parse to [`EventType::Unrecognized`] so records written by a
/// newer client never fail to load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    /// Batter reaches first on a hit.
    Single,
    /// Batter reaches second on a hit.
    Double,
    /// Batter reaches third on a hit.
    Triple,
    /// Batter and all runners score.
    HomeRun,
    /// Base on balls.
    Walk,
    /// Batter struck out.
    Strikeout,
    /// Batter out on a ground ball.
    GroundOut,
    /// Batter out on a fly ball.
    FlyOut,
    /// Batter out on a line drive.
    LineOut,
    /// Batter out on an infield pop-up.
    PopOut,
    /// Batter reaches on a fielding error.
    Error,
    /// Defense retires a runner instead of the batter.
    FieldersChoice,
    /// Fly-ball out that lets a runner on third score.
    SacrificeFly,
    /// A type this build does not know about.
    Unrecognized(String),
}

impl EventType {
    /// Every recognized event type.
    pub const KNOWN: [EventType; 13] = [
        EventType::Single,
        EventType::Double,
        EventType::Triple,
        EventType::HomeRun,
        EventType::Walk,
        EventType::Strikeout,
        EventType::GroundOut,
        EventType::FlyOut,
        EventType::LineOut,
        EventType::PopOut,
        EventType::Error,
        EventType::FieldersChoice,
        EventType::SacrificeFly,
    ];

    /// Kebab-case name used on the wire.
    pub fn as_str(&self) -> &str {
        match self {
            EventType::Single => "single",
            EventType::Double => "double",
            EventType::Triple => "triple",
            EventType::HomeRun => "home-run",
            EventType::Walk => "walk",
            EventType::Strikeout => "strikeout",
            EventType::GroundOut => "ground-out",
            EventType::FlyOut => "fly-out",
            EventType::LineOut => "line-out",
            EventType::PopOut => "pop-out",
            EventType::Error => "error",
            EventType::FieldersChoice => "fielders-choice",
            EventType::SacrificeFly => "sacrifice-fly",
            EventType::Unrecognized(name) => name,
        }
    }

    /// Parses a name, accepting common scorebook shorthands.
    #[instrument]
    pub fn parse(name: &str) -> Self {
        let normalized = name.trim().to_lowercase().replace(['_', ' '], "-").replace('\'', "");
        match normalized.as_str() {
            "single" | "1b" => EventType::Single,
            "double" | "2b" => EventType::Double,
            "triple" | "3b" => EventType::Triple,
            "home-run" | "homerun" | "hr" => EventType::HomeRun,
            "walk" | "bb" => EventType::Walk,
            "strikeout" | "k" => EventType::Strikeout,
            "ground-out" | "go" => EventType::GroundOut,
            "fly-out" | "fo" => EventType::FlyOut,
            "line-out" | "lo" => EventType::LineOut,
            "pop-out" | "po" => EventType::PopOut,
            "error" | "e" => EventType::Error,
            "fielders-choice" | "fc" => EventType::FieldersChoice,
            "sacrifice-fly" | "sac-fly" | "sf" => EventType::SacrificeFly,
            _ => EventType::Unrecognized(name.trim().to_string()),
        }
    }

    /// True for every type except [`EventType::Unrecognized`].
    pub fn is_recognized(&self) -> bool {
        !matches!(self, EventType::Unrecognized(_))
    }

    /// Single, double or triple (home runs are handled automatically).
    pub fn is_hit(&self) -> bool {
        matches!(self, EventType::Single | EventType::Double | EventType::Triple)
    }

    /// Routine batted-ball outs.
    pub fn is_batted_out(&self) -> bool {
        matches!(
            self,
            EventType::GroundOut | EventType::FlyOut | EventType::LineOut | EventType::PopOut
        )
    }

    /// Play types that always need the operator to place runners.
    pub fn needs_review(&self) -> bool {
        self.is_hit()
            || matches!(
                self,
                EventType::Error | EventType::FieldersChoice | EventType::SacrificeFly
            )
    }

    /// Fair contact hits where a runner on third may only score or be out.
    pub fn is_fair_contact_hit(&self) -> bool {
        self.is_hit() || *self == EventType::Error
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<String> for EventType {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<EventType> for String {
    fn from(event_type: EventType) -> Self {
        event_type.as_str().to_string()
    }
}

/// Which side of the plate the batter hit from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BattingSide {
    /// Left-handed.
    Left,
    /// Right-handed.
    Right,
    /// Switch hitter.
    Switch,
}

/// Where the ball was put in play, normalized to 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, derive_new::new)]
pub struct HitLocation {
    /// Horizontal coordinate, 0 = left foul line side.
    pub x: f64,
    /// Vertical coordinate, 100 = home plate.
    pub y: f64,
}

/// Optional analytics recorded with a play.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analytics {
    /// Fielding zone the ball was hit to; never the foul sentinel.
    #[serde(default)]
    pub zone: Option<FieldZone>,
    /// Contact location.
    #[serde(default)]
    pub location: Option<HitLocation>,
    /// Batter's side.
    #[serde(default)]
    pub batting_side: Option<BattingSide>,
}

/// One logged plate-appearance outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayEvent {
    /// Persisted id; `None` until the store confirms the event.
    pub id: Option<EventId>,
    /// Idempotency key shared by the optimistic and confirmed copies.
    pub client_key: ClientKey,
    /// Game this event belongs to.
    pub game_id: GameId,
    /// Creation time, the ordering key.
    pub recorded_at: DateTime<Utc>,
    /// Inning number.
    pub inning: u32,
    /// Half of the inning.
    pub half: Half,
    /// Batter for this plate appearance.
    pub batter_id: RosterId,
    /// What happened.
    pub event_type: EventType,
    /// Runs batted in.
    pub rbi: u32,
    /// Runs that crossed the plate, when different from `rbi`.
    #[serde(default)]
    pub runs: Option<u32>,
    /// Outs recorded on the play (0-3).
    pub outs_on_play: u8,
    /// Base occupancy immediately after the play.
    pub base_state_after: BaseState,
    /// Optional analytics.
    #[serde(default)]
    pub analytics: Analytics,
    /// Human-readable summary; not authoritative.
    #[serde(default)]
    pub description: String,
}

impl PlayEvent {
    /// Builds an unconfirmed event from an advancement outcome.
    #[instrument(skip(outcome, analytics), fields(batter = %batter_id, event = %event_type))]
    pub fn from_outcome(
        game_id: GameId,
        at: HalfInning,
        batter_id: RosterId,
        event_type: EventType,
        outcome: &PlayOutcome,
        analytics: Analytics,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        let description = describe(&batter_id, &event_type, outcome);
        let runs = (outcome.runs != outcome.rbi).then_some(outcome.runs);
        Self {
            id: None,
            client_key: ClientKey::generate(),
            game_id,
            recorded_at,
            inning: at.inning,
            half: at.half,
            batter_id,
            event_type,
            rbi: outcome.rbi,
            runs,
            outs_on_play: outcome.outs_on_play,
            base_state_after: outcome.base_state_after.clone(),
            analytics,
            description,
        }
    }

    /// The half-inning this play happened in.
    pub fn half_inning(&self) -> HalfInning {
        HalfInning::new(self.inning, self.half)
    }

    /// Runs that scored on the play.
    pub fn runs_scored(&self) -> u32 {
        self.runs.unwrap_or(self.rbi)
    }

    /// True once persistence has assigned an id.
    pub fn is_confirmed(&self) -> bool {
        self.id.is_some()
    }

    /// Key the log is sorted by.
    pub fn sort_key(&self) -> (DateTime<Utc>, ClientKey) {
        (self.recorded_at, self.client_key)
    }
}

fn describe(batter: &RosterId, event_type: &EventType, outcome: &PlayOutcome) -> String {
    let mut text = format!("{}: {}", batter, event_type);
    if !outcome.scored.is_empty() {
        let names: Vec<&str> = outcome.scored.iter().map(RosterId::as_str).collect();
        text.push_str(&format!("; scored {}", names.join(", ")));
    }
    if !outcome.retired.is_empty() {
        let names: Vec<&str> = outcome.retired.iter().map(RosterId::as_str).collect();
        text.push_str(&format!("; out {}", names.join(", ")));
    }
    if outcome.rbi > 0 {
        text.push_str(&format!("; {} RBI", outcome.rbi));
    }
    text
}
