//! Game state reducer: folds the play log into the observable game state.
//!
//! State is a projection of the log. The reducer is pure and deterministic,
//! so replaying the same log after reconciliation or undo always yields the
//! same result.
//!
//! Two classes of state feed the fold:
//! - the event-sourced offensive log ([`PlayEvent`]s), authoritative and
//!   shared by every client
//! - [`EphemeralState`], client-local counters for the opponent's turn at bat
//!   that are never replayed and resolve concurrent writers last-write-wins

use crate::advancement::OUTS_PER_HALF;
use crate::event::{GameId, PlayEvent};
use crate::types::{BaseState, Half, HalfInning, RosterId, TeamSide};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Fixed facts about a game that the fold needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_new::new)]
pub struct GameSetup {
    /// Game identifier.
    pub game_id: GameId,
    /// Whether the scoring team is home or away.
    pub team_side: TeamSide,
}

impl GameSetup {
    /// Half in which the scoring team bats.
    pub fn batting_half(&self) -> Half {
        self.team_side.batting_half()
    }
}

/// Outs recorded locally while the opponent bats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefensiveOuts {
    /// The defensive half-inning these outs belong to.
    pub half_inning: HalfInning,
    /// Outs so far (3 ends the half).
    pub outs: u8,
}

/// Client-local counters that are not event-sourced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EphemeralState {
    /// Opponent's runs, synced with a single last-write-wins call.
    pub opponent_score: u32,
    /// Outs in the current defensive half, if any were recorded.
    pub defensive_outs: Option<DefensiveOuts>,
    /// Manual correction applied on top of the event-sourced score.
    pub score_adjustment: i64,
}

impl EphemeralState {
    /// Records one defensive out in `at`, starting a fresh count when `at` is
    /// a different half than the stored one. Returns the new out count.
    #[instrument(skip(self))]
    pub fn record_defensive_out(&mut self, at: HalfInning) -> u8 {
        let outs = match self.defensive_outs {
            Some(current) if current.half_inning == at => current.outs.saturating_add(1),
            _ => 1,
        }
        .min(OUTS_PER_HALF);
        self.defensive_outs = Some(DefensiveOuts {
            half_inning: at,
            outs,
        });
        debug!(outs, half_inning = %at, "Defensive out recorded");
        outs
    }

    /// Adds runs to the opponent's score and returns the new total.
    pub fn add_opponent_runs(&mut self, runs: u32) -> u32 {
        self.opponent_score = self.opponent_score.saturating_add(runs);
        self.opponent_score
    }

    /// Sets the score adjustment so the displayed score equals `desired`
    /// given the runs already in the log.
    pub fn override_score(&mut self, desired: u32, logged_runs: u32) {
        self.score_adjustment = i64::from(desired) - i64::from(logged_runs);
    }
}

/// The observable state of the game, always recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DerivedGameState {
    /// Current inning.
    pub inning: u32,
    /// Current half.
    pub half: Half,
    /// Outs in the current half (0-2).
    pub outs: u8,
    /// Scoring team's runs.
    pub score: u32,
    /// Opponent's runs (ephemeral).
    pub opponent_score: u32,
    /// Current base occupancy.
    pub runners: BaseState,
    /// Cursor into the batting lineup.
    pub batting_order_index: usize,
    /// Batter due up, when the lineup is known.
    pub current_batter: Option<RosterId>,
    /// Whether the scoring team is at bat.
    pub offense: bool,
    /// Plate appearances in the log.
    pub plate_appearances: usize,
    /// Scoring team's runs per inning, inning 1 first.
    pub line_score: Vec<u32>,
}

impl DerivedGameState {
    /// The current half-inning.
    pub fn half_inning(&self) -> HalfInning {
        HalfInning::new(self.inning, self.half)
    }
}

/// Folds `events` (already in log order) into the derived game state.
///
/// Each event adds its runs, replaces the bases with its snapshot and adds
/// its outs; three outs flip the half. An event stamped with a later
/// half-inning than the fold has reached moves the fold there first.
/// Unrecognized events leave bases, outs and score untouched; events outside
/// innings 1 to [`MAX_INNING`](crate::MAX_INNING) are skipped. When the fold
/// ends on the opponent's half, the matching defensive outs are overlaid.
#[instrument(skip_all, fields(game_id = %setup.game_id, lineup = lineup.len()))]
pub fn reduce<'a, I>(
    events: I,
    lineup: &[RosterId],
    setup: &GameSetup,
    ephemeral: &EphemeralState,
) -> DerivedGameState
where
    I: IntoIterator<Item = &'a PlayEvent>,
{
    let mut position = HalfInning::OPENING;
    let mut outs: u8 = 0;
    let mut runners = BaseState::new();
    let mut logged_runs: u64 = 0;
    let mut batting_order_index = 0usize;
    let mut plate_appearances = 0usize;
    let mut line_score: Vec<u32> = Vec::new();

    for event in events {
        let at = event.half_inning();
        if !at.is_valid() {
            warn!(
                inning = event.inning,
                client_key = %event.client_key,
                "Event with an out-of-range inning skipped"
            );
            continue;
        }
        if at > position {
            debug!(from = %position, to = %at, "Advancing to the event's half-inning");
            position = at;
            outs = 0;
            runners = BaseState::new();
        } else if at < position {
            warn!(
                event_half = %at,
                current = %position,
                client_key = %event.client_key,
                "Event stamped with a closed half-inning; applying to the current one"
            );
        }

        if event.event_type.is_recognized() {
            let runs = event.runs_scored();
            logged_runs += u64::from(runs);
            let slot = position.inning.max(1) as usize - 1;
            if line_score.len() <= slot {
                line_score.resize(slot + 1, 0);
            }
            line_score[slot] = line_score[slot].saturating_add(runs);
            runners = event.base_state_after.clone();
            outs = outs.saturating_add(event.outs_on_play.min(OUTS_PER_HALF));
        } else {
            warn!(
                event_type = %event.event_type,
                client_key = %event.client_key,
                "Unrecognized event type; keeping bases, no outs or runs recorded"
            );
        }

        plate_appearances += 1;
        if !lineup.is_empty() {
            batting_order_index = (batting_order_index + 1) % lineup.len();
        }

        if outs >= OUTS_PER_HALF {
            debug!(half_inning = %position, "Third out; flipping half");
            outs = 0;
            runners = BaseState::new();
            position = position.next();
        }
    }

    let mut offense = position.half == setup.batting_half();
    if !offense
        && let Some(defense) = ephemeral.defensive_outs
        && defense.half_inning == position
    {
        if defense.outs >= OUTS_PER_HALF {
            debug!(half_inning = %position, "Defensive half complete");
            position = position.next();
            outs = 0;
            runners = BaseState::new();
            offense = true;
        } else {
            outs = defense.outs;
        }
    }

    let score = (logged_runs as i64 + ephemeral.score_adjustment)
        .clamp(0, i64::from(u32::MAX)) as u32;

    DerivedGameState {
        inning: position.inning,
        half: position.half,
        outs,
        score,
        opponent_score: ephemeral.opponent_score,
        runners,
        batting_order_index,
        current_batter: lineup.get(batting_order_index).cloned(),
        offense,
        plate_appearances,
        line_score,
    }
}

/// Sum of runs in the log, before any manual adjustment.
pub fn logged_runs<'a, I>(events: I) -> u32
where
    I: IntoIterator<Item = &'a PlayEvent>,
{
    events
        .into_iter()
        .filter(|e| e.event_type.is_recognized() && e.half_inning().is_valid())
        .map(PlayEvent::runs_scored)
        .fold(0, u32::saturating_add)
}
