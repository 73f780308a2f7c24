//! Operator-reviewed plays: candidate dispositions and their resolution.

use super::forced::forced_bases;
use super::{AdvancementError, OUTS_PER_HALF, PlayOutcome, RbiPolicy};
use crate::event::EventType;
use crate::types::{Base, BaseState, RosterId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, info, instrument};

/// What happens to one runner on the play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    /// Holds the current base.
    Stay,
    /// Ends the play on the given base.
    Advance(Base),
    /// Crosses home plate.
    Score,
    /// Is put out.
    Out,
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Disposition::Stay => f.write_str("stay"),
            Disposition::Advance(base) => write!(f, "{}", base),
            Disposition::Score => f.write_str("score"),
            Disposition::Out => f.write_str("out"),
        }
    }
}

impl FromStr for Disposition {
    type Err = crate::types::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stay" | "hold" => Ok(Disposition::Stay),
            "score" | "home" => Ok(Disposition::Score),
            "out" => Ok(Disposition::Out),
            other => other.parse::<Base>().map(Disposition::Advance).map_err(|_| {
                crate::types::ParseError::new(format!("Invalid disposition: '{}'", s))
            }),
        }
    }
}

/// Chosen disposition per occupied base.
pub type Dispositions = BTreeMap<Base, Disposition>;

/// Where the batter ends up, independent of the runners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BatterResult {
    /// Batter reaches the given base.
    Reaches(Base),
    /// Batter is put out on a caught ball.
    Out,
}

impl BatterResult {
    /// Batter's result for a reviewed play type.
    pub fn for_event(event_type: &EventType) -> Self {
        match event_type {
            EventType::Double => BatterResult::Reaches(Base::Second),
            EventType::Triple => BatterResult::Reaches(Base::Third),
            EventType::Single | EventType::Error | EventType::FieldersChoice => {
                BatterResult::Reaches(Base::First)
            }
            _ => BatterResult::Out,
        }
    }

    fn destination(self) -> Option<Base> {
        match self {
            BatterResult::Reaches(base) => Some(base),
            BatterResult::Out => None,
        }
    }
}

/// Legal choices for the runner on one base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerOptions {
    /// Base the runner starts on.
    pub base: Base,
    /// The runner.
    pub runner: RosterId,
    /// Whether the runner must vacate the base.
    pub forced: bool,
    /// Dispositions the operator may choose from.
    pub candidates: Vec<Disposition>,
}

/// A play waiting for the operator to place every runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRequest {
    event_type: EventType,
    bases_before: BaseState,
    outs_before: u8,
    batter: RosterId,
    batter_result: BatterResult,
    runners: Vec<RunnerOptions>,
    policy: RbiPolicy,
}

impl ReviewRequest {
    /// Opens a review and enumerates the candidates for every runner.
    #[instrument(skip(bases_before, policy), fields(bases = %bases_before))]
    pub fn new(
        event_type: EventType,
        bases_before: BaseState,
        outs_before: u8,
        batter: RosterId,
        policy: RbiPolicy,
    ) -> Self {
        let batter_result = BatterResult::for_event(&event_type);
        let forced = forced_bases(&bases_before, batter_result.destination());

        let runners = Base::LEAD_FIRST
            .iter()
            .filter_map(|base| {
                let runner = bases_before.get(*base)?.clone();
                let is_forced = forced.contains(base);
                Some(RunnerOptions {
                    base: *base,
                    runner,
                    forced: is_forced,
                    candidates: candidates(&event_type, *base, is_forced),
                })
            })
            .collect();

        debug!(?runners, ?batter_result, "Opened review");
        Self {
            event_type,
            bases_before,
            outs_before,
            batter,
            batter_result,
            runners,
            policy,
        }
    }

    /// The play under review.
    pub fn event_type(&self) -> &EventType {
        &self.event_type
    }

    /// Runners with their legal choices, lead runner first.
    pub fn runners(&self) -> &[RunnerOptions] {
        &self.runners
    }

    /// Where the batter goes if the half-inning does not end first.
    pub fn batter_result(&self) -> BatterResult {
        self.batter_result
    }

    /// Bases before the play.
    pub fn bases_before(&self) -> &BaseState {
        &self.bases_before
    }

    /// Outs before the play.
    pub fn outs_before(&self) -> u8 {
        self.outs_before
    }

    /// Default selection: forced runners move up one base, others hold.
    pub fn default_dispositions(&self) -> Dispositions {
        self.runners
            .iter()
            .map(|opt| {
                let choice = if opt.forced || !opt.candidates.contains(&Disposition::Stay) {
                    opt.base
                        .next()
                        .map(Disposition::Advance)
                        .unwrap_or(Disposition::Score)
                } else {
                    Disposition::Stay
                };
                (opt.base, choice)
            })
            .collect()
    }

    /// Settles the play with one disposition per runner.
    ///
    /// Outs by the batter on a caught ball come first, then runners from the
    /// lead runner back, then the batter reaching base. Once the third out is
    /// made nothing else moves and no later run counts.
    ///
    /// # Errors
    ///
    /// Returns [`AdvancementError`] when a runner is missing a disposition, a
    /// disposition names an empty base or an illegal choice, two runners land
    /// on one base, or a runner passes the runner ahead.
    #[instrument(skip(self, selections), fields(event = %self.event_type, outs_before = self.outs_before))]
    pub fn resolve(&self, selections: &Dispositions) -> Result<PlayOutcome, AdvancementError> {
        self.validate(selections)?;

        let mut outs = self.outs_before;
        let mut after = BaseState::new();
        let mut scored = Vec::new();
        let mut retired = Vec::new();
        let mut inning_over = false;

        if self.batter_result == BatterResult::Out {
            retired.push(self.batter.clone());
            outs += 1;
            inning_over = outs >= OUTS_PER_HALF;
        }

        // Position (1-3, 4 = home) of the nearest surviving runner ahead.
        let mut lead_position: u8 = 4;

        for opt in &self.runners {
            if inning_over {
                after.set(opt.base, Some(opt.runner.clone()));
                continue;
            }
            let target = match selections.get(&opt.base).copied() {
                Some(Disposition::Stay) => Some(opt.base),
                Some(Disposition::Advance(base)) => Some(base),
                Some(Disposition::Score) => None,
                Some(Disposition::Out) => {
                    retired.push(opt.runner.clone());
                    outs += 1;
                    inning_over = outs >= OUTS_PER_HALF;
                    continue;
                }
                None => return Err(AdvancementError::MissingDisposition(opt.base)),
            };

            let position = target.map(Base::number).unwrap_or(4);
            if position > lead_position {
                return Err(AdvancementError::RunnerPassed(opt.base));
            }
            lead_position = position;
            match target {
                Some(base) => {
                    if after.is_occupied(base) {
                        return Err(AdvancementError::BaseCollision(base));
                    }
                    after.set(base, Some(opt.runner.clone()));
                }
                None => scored.push(opt.runner.clone()),
            }
        }

        if let BatterResult::Reaches(base) = self.batter_result
            && !inning_over
        {
            if base.number() > lead_position {
                return Err(AdvancementError::RunnerPassed(base));
            }
            if after.is_occupied(base) {
                return Err(AdvancementError::BaseCollision(base));
            }
            after.set(base, Some(self.batter.clone()));
        }

        let runs = scored.len() as u32;
        let outcome = PlayOutcome {
            runs,
            rbi: self.policy.rbi_for(&self.event_type, runs),
            outs_on_play: outs - self.outs_before,
            base_state_after: after,
            scored,
            retired,
        };
        info!(
            runs = outcome.runs,
            rbi = outcome.rbi,
            outs_on_play = outcome.outs_on_play,
            bases = %outcome.base_state_after,
            "Play resolved"
        );
        Ok(outcome)
    }

    fn validate(&self, selections: &Dispositions) -> Result<(), AdvancementError> {
        for (base, disposition) in selections {
            let Some(opt) = self.runners.iter().find(|o| o.base == *base) else {
                return Err(AdvancementError::EmptyBase(*base));
            };
            if !opt.candidates.contains(disposition) {
                return Err(AdvancementError::IllegalDisposition {
                    base: *base,
                    disposition: *disposition,
                });
            }
        }
        if let Some(missing) = self.runners.iter().find(|o| !selections.contains_key(&o.base)) {
            return Err(AdvancementError::MissingDisposition(missing.base));
        }
        Ok(())
    }
}

/// Candidate dispositions for a runner on `base`.
fn candidates(event_type: &EventType, base: Base, forced: bool) -> Vec<Disposition> {
    let runner_on_third_must_go = base == Base::Third
        && (event_type.is_fair_contact_hit() || *event_type == EventType::SacrificeFly);
    if runner_on_third_must_go {
        return vec![Disposition::Score, Disposition::Out];
    }

    let mut options = Vec::new();
    if !forced {
        options.push(Disposition::Stay);
    }
    options.extend(base.ahead().map(Disposition::Advance));
    options.push(Disposition::Score);
    options.push(Disposition::Out);
    options
}
