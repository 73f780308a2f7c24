//! A player occupies at most one base.

use super::Invariant;
use crate::reducer::DerivedGameState;

/// Invariant: no runner appears on two bases.
pub struct DistinctRunnersInvariant;

impl Invariant<DerivedGameState> for DistinctRunnersInvariant {
    fn holds(state: &DerivedGameState) -> bool {
        !state.runners.has_duplicate_runner()
    }

    fn description() -> &'static str {
        "Each runner occupies at most one base"
    }
}
