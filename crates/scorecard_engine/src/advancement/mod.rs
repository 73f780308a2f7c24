//! Runner advancement under forced-advance rules.
//!
//! Given a play type, the current bases and the outs already recorded, the
//! engine either settles the play on its own ([`Advancement::Automatic`]) or
//! lists the legal dispositions for every runner and waits for the operator
//! to choose ([`Advancement::Review`]).

mod forced;
mod review;

pub use forced::{forced_bases, home_run, routine_out, walk};
pub use review::{BatterResult, Disposition, Dispositions, ReviewRequest, RunnerOptions};

use crate::event::EventType;
use crate::types::{Base, BaseState, RosterId};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

/// Outs that end a half-inning.
pub const OUTS_PER_HALF: u8 = 3;

/// How runs are credited to the batter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RbiPolicy {
    /// Whether runs scoring on a fielding error count as runs batted in.
    pub credit_runs_on_error: bool,
}

impl Default for RbiPolicy {
    fn default() -> Self {
        Self {
            credit_runs_on_error: true,
        }
    }
}

impl RbiPolicy {
    /// Runs batted in for `runs` that scored on a play of `event_type`.
    pub fn rbi_for(&self, event_type: &EventType, runs: u32) -> u32 {
        match event_type {
            EventType::Error if !self.credit_runs_on_error => 0,
            _ => runs,
        }
    }
}

/// Settled result of a play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayOutcome {
    /// Runs that crossed the plate.
    pub runs: u32,
    /// Runs credited to the batter.
    pub rbi: u32,
    /// Outs recorded on the play.
    pub outs_on_play: u8,
    /// Base occupancy after the play.
    pub base_state_after: BaseState,
    /// Players who scored, lead runner first.
    pub scored: Vec<RosterId>,
    /// Players put out, in the order the outs were made.
    pub retired: Vec<RosterId>,
}

impl PlayOutcome {
    /// An outcome where nothing moves and nobody is out.
    pub fn unchanged(bases: &BaseState) -> Self {
        Self {
            runs: 0,
            rbi: 0,
            outs_on_play: 0,
            base_state_after: bases.clone(),
            scored: Vec::new(),
            retired: Vec::new(),
        }
    }
}

/// What the engine needs from the operator to settle a play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advancement {
    /// The play settles without operator input.
    Automatic(PlayOutcome),
    /// Runners need a disposition each before the play can settle.
    Review(ReviewRequest),
}

/// Error resolving a play.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum AdvancementError {
    /// No disposition was chosen for an occupied base.
    #[display("No disposition chosen for the runner on {}", _0)]
    MissingDisposition(Base),

    /// A disposition was given for a base nobody occupies.
    #[display("No runner on {}", _0)]
    EmptyBase(Base),

    /// The chosen disposition is not among the candidates for that runner.
    #[display("{} is not a legal disposition for the runner on {}", disposition, base)]
    IllegalDisposition {
        /// Base of the runner.
        base: Base,
        /// Rejected choice.
        disposition: Disposition,
    },

    /// Two runners would end up on the same base.
    #[display("Two runners would occupy {}", _0)]
    BaseCollision(Base),

    /// A trailing runner would pass a lead runner.
    #[display("Runner from {} would pass the runner ahead", _0)]
    RunnerPassed(Base),

    /// The play type cannot be reviewed.
    #[display("{} cannot be reviewed", _0)]
    NotReviewable(EventType),
}

impl std::error::Error for AdvancementError {}

/// Decides how a play of `event_type` settles from the given situation.
///
/// Routine outs, strikeouts, walks and home runs settle automatically. Hits,
/// errors, fielder's choices and sacrifice flies return a review request.
/// Unrecognized types keep the bases unchanged and record nothing.
#[instrument(skip(bases, policy), fields(bases = %bases))]
pub fn evaluate(
    event_type: &EventType,
    bases: &BaseState,
    outs_before: u8,
    batter: &RosterId,
    policy: RbiPolicy,
) -> Advancement {
    let outs_before = clamp_outs(outs_before);
    match event_type {
        EventType::Strikeout
        | EventType::GroundOut
        | EventType::FlyOut
        | EventType::LineOut
        | EventType::PopOut => Advancement::Automatic(routine_out(bases, batter)),
        EventType::Walk => Advancement::Automatic(walk(bases, batter)),
        EventType::HomeRun => Advancement::Automatic(home_run(bases, batter)),
        EventType::Single
        | EventType::Double
        | EventType::Triple
        | EventType::Error
        | EventType::FieldersChoice
        | EventType::SacrificeFly => Advancement::Review(ReviewRequest::new(
            event_type.clone(),
            bases.clone(),
            outs_before,
            batter.clone(),
            policy,
        )),
        EventType::Unrecognized(name) => {
            warn!(event_type = %name, "Unrecognized event type; bases left unchanged");
            Advancement::Automatic(PlayOutcome::unchanged(bases))
        }
    }
}

/// Opens a review for a routine batted out the operator wants to override,
/// e.g. a runner tagging up on a fly ball.
///
/// # Errors
///
/// Returns [`AdvancementError::NotReviewable`] for anything other than a
/// batted-ball out or a play that already needs review.
#[instrument(skip(bases, policy), fields(bases = %bases))]
pub fn review_with_override(
    event_type: &EventType,
    bases: &BaseState,
    outs_before: u8,
    batter: &RosterId,
    policy: RbiPolicy,
) -> Result<ReviewRequest, AdvancementError> {
    if !(event_type.is_batted_out() || event_type.needs_review()) {
        return Err(AdvancementError::NotReviewable(event_type.clone()));
    }
    Ok(ReviewRequest::new(
        event_type.clone(),
        bases.clone(),
        clamp_outs(outs_before),
        batter.clone(),
        policy,
    ))
}

fn clamp_outs(outs_before: u8) -> u8 {
    if outs_before >= OUTS_PER_HALF {
        warn!(outs_before, "Play evaluated with the half-inning already over");
        OUTS_PER_HALF - 1
    } else {
        outs_before
    }
}
