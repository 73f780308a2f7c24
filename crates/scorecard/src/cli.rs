//! Command-line interface for scorecard.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Scorecard - live play-by-play scorekeeping
#[derive(Parser, Debug)]
#[command(name = "scorecard")]
#[command(about = "Score a baseball or softball game play by play", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the current game state
    State {
        /// Path to the game configuration file
        #[arg(short, long, default_value = "scorecard.toml")]
        config: PathBuf,

        /// Override the database file from the configuration
        #[arg(long)]
        db_path: Option<String>,
    },

    /// List every logged play with the state after it
    Replay {
        /// Path to the game configuration file
        #[arg(short, long, default_value = "scorecard.toml")]
        config: PathBuf,

        /// Override the database file from the configuration
        #[arg(long)]
        db_path: Option<String>,
    },

    /// Score the game interactively from stdin
    Session {
        /// Path to the game configuration file
        #[arg(short, long, default_value = "scorecard.toml")]
        config: PathBuf,

        /// Override the database file from the configuration
        #[arg(long)]
        db_path: Option<String>,
    },
}
