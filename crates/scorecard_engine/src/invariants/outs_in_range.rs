//! Outs stay below three; the third out always flips the half.

use super::Invariant;
use crate::advancement::OUTS_PER_HALF;
use crate::reducer::DerivedGameState;

/// Invariant: the observable out count is 0, 1 or 2.
pub struct OutsInRangeInvariant;

impl Invariant<DerivedGameState> for OutsInRangeInvariant {
    fn holds(state: &DerivedGameState) -> bool {
        state.outs < OUTS_PER_HALF
    }

    fn description() -> &'static str {
        "Outs are between 0 and 2"
    }
}
