//! Plays that settle without operator input, and the force-chain rule.

use super::PlayOutcome;
use crate::types::{Base, BaseState, RosterId};
use tracing::{debug, instrument};

/// Bases whose runners are forced to move when the batter takes `batter_to`.
///
/// A runner is forced when the batter's destination is at or beyond its base,
/// or when the base behind it holds a forced runner. A runner on second with
/// first empty is never forced by a batter who stops at first.
#[instrument(skip(bases), fields(bases = %bases))]
pub fn forced_bases(bases: &BaseState, batter_to: Option<Base>) -> Vec<Base> {
    let Some(batter_to) = batter_to else {
        return Vec::new();
    };

    let mut forced = Vec::new();
    let mut behind_forced = true; // the batter is always "forced" out of the box
    for base in Base::ALL {
        let occupied = bases.is_occupied(base);
        let is_forced = occupied && (base <= batter_to || behind_forced);
        if is_forced {
            forced.push(base);
        }
        // A forced runner pushes the next one; an empty base breaks the chain
        // unless the batter runs through it.
        behind_forced = is_forced || (!occupied && base < batter_to);
    }
    debug!(?forced, "Computed forced runners");
    forced
}

/// Strikeout or routine batted out: the batter is out and nobody moves.
#[instrument(skip(bases), fields(bases = %bases))]
pub fn routine_out(bases: &BaseState, batter: &RosterId) -> PlayOutcome {
    PlayOutcome {
        runs: 0,
        rbi: 0,
        outs_on_play: 1,
        base_state_after: bases.clone(),
        scored: Vec::new(),
        retired: vec![batter.clone()],
    }
}

/// Base on balls: the batter takes first and only forced runners move up one.
#[instrument(skip(bases), fields(bases = %bases))]
pub fn walk(bases: &BaseState, batter: &RosterId) -> PlayOutcome {
    let forced = forced_bases(bases, Some(Base::First));
    let mut after = bases.clone();
    let mut scored = Vec::new();

    // Move lead runners first so nobody is overwritten.
    for base in Base::LEAD_FIRST {
        if !forced.contains(&base) {
            continue;
        }
        let runner = after.take(base);
        match base.next() {
            Some(next) => after.set(next, runner),
            None => scored.extend(runner),
        }
    }
    after.set(Base::First, Some(batter.clone()));

    let runs = scored.len() as u32;
    PlayOutcome {
        runs,
        rbi: runs,
        outs_on_play: 0,
        base_state_after: after,
        scored,
        retired: Vec::new(),
    }
}

/// Home run: every runner and the batter score; the bases clear.
#[instrument(skip(bases), fields(bases = %bases))]
pub fn home_run(bases: &BaseState, batter: &RosterId) -> PlayOutcome {
    let mut scored: Vec<RosterId> = Base::LEAD_FIRST
        .iter()
        .filter_map(|b| bases.get(*b).cloned())
        .collect();
    scored.push(batter.clone());

    let runs = scored.len() as u32;
    PlayOutcome {
        runs,
        rbi: runs,
        outs_on_play: 0,
        base_state_after: BaseState::new(),
        scored,
        retired: Vec::new(),
    }
}
