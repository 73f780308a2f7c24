//! Our runners are off the bases while the opponent bats.

use super::Invariant;
use crate::reducer::DerivedGameState;

/// Invariant: when the scoring team is in the field, the tracked bases are
/// empty.
///
/// Runners left on at the third out are cleared by the half flip, and the
/// opponent's baserunners are not tracked.
pub struct DefenseClearsBasesInvariant;

impl Invariant<DerivedGameState> for DefenseClearsBasesInvariant {
    fn holds(state: &DerivedGameState) -> bool {
        state.offense || state.runners.is_empty()
    }

    fn description() -> &'static str {
        "Bases are empty while the opponent bats"
    }
}
