//! Scorecard - live play-by-play scorekeeping
//!
//! Wires the [`scorecard_engine`] state machine to its collaborators.
//!
//! # Architecture
//!
//! - **Store**: [`PlayStore`] persistence, in memory or SQLite via diesel
//! - **Feed**: [`PushHub`] fans stored changes out to every open client
//! - **Live game**: [`LiveGame`] appends plays optimistically, reconciles
//!   push messages and republishes the derived state
//! - **Console**: a line-oriented scoring session over stdin
//!
//! # Example
//!
//! ```no_run
//! use scorecard::{FixedLineup, LiveGame, MemoryStore, Publishing, PushHub};
//! use scorecard_engine::{EventType, GameSetup, RbiPolicy, TeamSide};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let hub = PushHub::new();
//! let store = Arc::new(Publishing::new(MemoryStore::new(), hub.clone()));
//! let roster = FixedLineup::from_names(["ana", "ben", "cho"]);
//!
//! let mut game = LiveGame::load(
//!     GameSetup::new("game-1".to_string(), TeamSide::Away),
//!     store,
//!     &roster,
//!     RbiPolicy::default(),
//! )
//! .await?;
//! game.connect(&hub).await?;
//! game.submit_play(EventType::Walk, Default::default()).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod db;
mod feed;
mod live;
mod repl;
mod roster;
mod store;

// Crate-level exports - Configuration
pub use config::{ConfigError, ScorecardConfig};

// Crate-level exports - Database
pub use db::{DbError, GameRow, GameScoreUpdate, MIGRATIONS, NewPlayRow, PlayRepository, PlayRow};

// Crate-level exports - Persistence collaborators
pub use store::{MemoryStore, PlayStore, SqliteStore, StoreError};

// Crate-level exports - Push channel
pub use feed::{DEFAULT_FEED_CAPACITY, FeedItem, Publishing, PushFeed, PushHub, PushSubscription};

// Crate-level exports - Roster
pub use roster::{FixedLineup, Roster};

// Crate-level exports - Live game
pub use live::{LiveGame, LiveGameError, PlayInput};

// Crate-level exports - Scoring console
pub use repl::{HELP, ReplCommand, Reply, execute, parse_command, render_review, render_state, run_session};
