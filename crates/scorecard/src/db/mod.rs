//! Database persistence layer for play events and opponent scores.

mod error;
mod models;
mod repository;
mod schema; // Diesel generated schema - internal use only

pub use error::DbError;
pub use models::{GameRow, GameScoreUpdate, NewPlayRow, PlayRow};
pub use repository::{MIGRATIONS, PlayRepository};
