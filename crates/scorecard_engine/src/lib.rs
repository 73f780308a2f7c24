//! Scorecard engine - pure play-by-play scoring logic
//!
//! Derives the state of a baseball or softball game from an append-only log
//! of plate-appearance outcomes.
//!
//! # Architecture
//!
//! - **Zone**: classifies batted-ball contact into a fielding zone
//! - **Advancement**: forced-advance rules and operator-reviewed runner moves
//! - **Event**: the logged play record and its wire names
//! - **Reducer**: folds the log and the ephemeral defensive counters into
//!   the derived game state
//! - **Reconcile**: merges optimistic, confirmed and pushed plays into one
//!   ordered log
//! - **Undo**: targets the latest confirmed play for deletion
//! - **Contracts / Invariants**: checks around every recorded play
//!
//! Nothing here performs I/O; the `scorecard` crate drives the engine
//! against persistence and a push channel.
//!
//! # Example
//!
//! ```
//! use scorecard_engine::{
//!     Advancement, EphemeralState, EventType, GameSetup, PlayLog, RbiPolicy, RosterId,
//!     TeamSide, evaluate, reduce,
//! };
//!
//! let setup = GameSetup::new("game-1".to_string(), TeamSide::Away);
//! let lineup = vec![RosterId::from("ana"), RosterId::from("ben")];
//! let log = PlayLog::new("game-1");
//! let state = reduce(log.events(), &lineup, &setup, &EphemeralState::default());
//! assert_eq!(state.current_batter, Some(RosterId::from("ana")));
//!
//! let advancement = evaluate(&EventType::Walk, &state.runners, state.outs, &lineup[0], RbiPolicy::default());
//! assert!(matches!(advancement, Advancement::Automatic(_)));
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod advancement;
mod contracts;
mod event;
mod invariants;
mod reconcile;
mod reducer;
mod types;
mod undo;
mod zone;

// Crate-level exports - Core types
pub use types::{Base, BaseState, Half, HalfInning, MAX_INNING, ParseError, RosterId, TeamSide};

// Crate-level exports - Field zones
pub use zone::{FieldZone, classify, is_fair};

// Crate-level exports - Play events
pub use event::{
    Analytics, BattingSide, ClientKey, EventId, EventType, GameId, HitLocation, PlayEvent,
};

// Crate-level exports - Runner advancement
pub use advancement::{
    Advancement, AdvancementError, BatterResult, Disposition, Dispositions, OUTS_PER_HALF,
    PlayOutcome, RbiPolicy, ReviewRequest, RunnerOptions, evaluate, forced_bases, home_run,
    review_with_override, routine_out, walk,
};

// Crate-level exports - Reduction
pub use reducer::{
    DefensiveOuts, DerivedGameState, EphemeralState, GameSetup, logged_runs, reduce,
};

// Crate-level exports - Reconciliation and undo
pub use reconcile::{ConnectionState, EntryStatus, LogEntry, PlayLog, PushMessage};
pub use undo::{UndoError, UndoRequest, plan_undo};

// Crate-level exports - Contracts and invariants
pub use contracts::{
    Contract, ContractError, FieldersChoiceHasRunner, LegalPlay, OffenseAtBat, PlayContract,
    SacrificeFlyPossible,
};
pub use invariants::{
    DefenseClearsBasesInvariant, DistinctRunnersInvariant, GameStateInvariants, Invariant,
    InvariantSet, InvariantViolation, OutsInRangeInvariant, check_game_state,
};
