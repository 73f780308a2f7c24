//! Contract-based validation for recording plays.
//!
//! A play request is checked against the current derived state before
//! anything is submitted (preconditions), and the state recomputed after the
//! play is checked against the game-state invariants (postconditions).

use crate::advancement::OUTS_PER_HALF;
use crate::event::EventType;
use crate::invariants::check_game_state;
use crate::reducer::DerivedGameState;
use crate::types::{Base, HalfInning};
use tracing::{instrument, warn};

/// Why a play request was rejected.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ContractError {
    /// The scoring team is in the field.
    #[display("The opponent is batting in {}", _0)]
    NotBatting(HalfInning),

    /// Fielder's choice with nobody on base.
    #[display("Fielder's choice needs a runner on base")]
    NoRunnerForFieldersChoice,

    /// Sacrifice fly with third base empty.
    #[display("Sacrifice fly needs a runner on third")]
    NoRunnerOnThird,

    /// Sacrifice fly with two outs.
    #[display("Sacrifice fly is not possible with {} outs", _0)]
    SacrificeFlyWithTwoOuts(u8),

    /// The recomputed state broke a game-state invariant.
    #[display("Invariant violation: {}", _0)]
    InvariantViolation(String),
}

impl std::error::Error for ContractError {}

// ─────────────────────────────────────────────────────────────
//  Contract Trait
// ─────────────────────────────────────────────────────────────

/// Preconditions and postconditions for a state transition.
pub trait Contract<S, A> {
    /// Checks preconditions before applying the action.
    fn pre(state: &S, action: &A) -> Result<(), ContractError>;

    /// Checks postconditions after applying the action.
    fn post(before: &S, after: &S) -> Result<(), ContractError>;
}

// ─────────────────────────────────────────────────────────────
//  Play Preconditions
// ─────────────────────────────────────────────────────────────

/// Precondition: the scoring team is at bat.
pub struct OffenseAtBat;

impl OffenseAtBat {
    /// Checks the precondition.
    #[instrument(skip(state))]
    pub fn check(state: &DerivedGameState) -> Result<(), ContractError> {
        if state.offense {
            Ok(())
        } else {
            Err(ContractError::NotBatting(state.half_inning()))
        }
    }
}

/// Precondition: a fielder's choice needs someone on base to retire.
pub struct FieldersChoiceHasRunner;

impl FieldersChoiceHasRunner {
    /// Checks the precondition.
    #[instrument(skip(state))]
    pub fn check(event_type: &EventType, state: &DerivedGameState) -> Result<(), ContractError> {
        if *event_type == EventType::FieldersChoice && state.runners.is_empty() {
            Err(ContractError::NoRunnerForFieldersChoice)
        } else {
            Ok(())
        }
    }
}

/// Precondition: a sacrifice fly needs a runner on third and fewer than two
/// outs.
pub struct SacrificeFlyPossible;

impl SacrificeFlyPossible {
    /// Checks the precondition.
    #[instrument(skip(state))]
    pub fn check(event_type: &EventType, state: &DerivedGameState) -> Result<(), ContractError> {
        if *event_type != EventType::SacrificeFly {
            return Ok(());
        }
        if !state.runners.is_occupied(Base::Third) {
            return Err(ContractError::NoRunnerOnThird);
        }
        if state.outs >= OUTS_PER_HALF - 1 {
            return Err(ContractError::SacrificeFlyWithTwoOuts(state.outs));
        }
        Ok(())
    }
}

/// Composite precondition for recording a play.
pub struct LegalPlay;

impl LegalPlay {
    /// Validates all preconditions for a play.
    #[instrument(skip(state))]
    pub fn check(event_type: &EventType, state: &DerivedGameState) -> Result<(), ContractError> {
        OffenseAtBat::check(state)?;
        FieldersChoiceHasRunner::check(event_type, state)?;
        SacrificeFlyPossible::check(event_type, state)?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────
//  Play Contract (Pre + Post)
// ─────────────────────────────────────────────────────────────

/// Contract for recording a play.
///
/// Preconditions:
/// - The scoring team is at bat
/// - Fielder's choice has a runner to retire
/// - Sacrifice fly has a runner on third and fewer than two outs
///
/// Postconditions:
/// - Every game-state invariant holds
pub struct PlayContract;

impl Contract<DerivedGameState, EventType> for PlayContract {
    fn pre(state: &DerivedGameState, action: &EventType) -> Result<(), ContractError> {
        LegalPlay::check(action, state)
    }

    fn post(_before: &DerivedGameState, after: &DerivedGameState) -> Result<(), ContractError> {
        check_game_state(after).map_err(|violations| {
            let descriptions = violations
                .iter()
                .map(|v| v.description.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            warn!(%descriptions, "Postcondition failed");
            ContractError::InvariantViolation(descriptions)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::PlayEvent;
    use crate::reducer::{EphemeralState, GameSetup, reduce};
    use crate::types::{RosterId, TeamSide};

    fn state(side: TeamSide) -> DerivedGameState {
        let setup = GameSetup::new("g".to_string(), side);
        reduce(
            std::iter::empty::<&PlayEvent>(),
            &[RosterId::from("a")],
            &setup,
            &EphemeralState::default(),
        )
    }

    #[test]
    fn test_rejects_play_on_defense() {
        let home = state(TeamSide::Home);
        assert_eq!(
            PlayContract::pre(&home, &EventType::Single),
            Err(ContractError::NotBatting(HalfInning::OPENING))
        );
    }

    #[test]
    fn test_fielders_choice_needs_runner() {
        let away = state(TeamSide::Away);
        assert_eq!(
            PlayContract::pre(&away, &EventType::FieldersChoice),
            Err(ContractError::NoRunnerForFieldersChoice)
        );
    }

    #[test]
    fn test_sacrifice_fly_preconditions() {
        let mut away = state(TeamSide::Away);
        assert_eq!(
            PlayContract::pre(&away, &EventType::SacrificeFly),
            Err(ContractError::NoRunnerOnThird)
        );
        away.runners.third = Some("r3".into());
        assert!(PlayContract::pre(&away, &EventType::SacrificeFly).is_ok());
        away.outs = 2;
        assert_eq!(
            PlayContract::pre(&away, &EventType::SacrificeFly),
            Err(ContractError::SacrificeFlyWithTwoOuts(2))
        );
    }

    #[test]
    fn test_post_reports_violations() {
        let before = state(TeamSide::Away);
        let mut after = before.clone();
        after.outs = 3;
        assert!(matches!(
            PlayContract::post(&before, &after),
            Err(ContractError::InvariantViolation(_))
        ));
    }
}
