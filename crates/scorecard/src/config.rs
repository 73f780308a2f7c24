//! Scorekeeper configuration loaded from TOML.

use derive_getters::Getters;
use derive_more::{Display, Error};
use scorecard_engine::{GameSetup, RbiPolicy, RosterId, TeamSide};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::roster::FixedLineup;

/// Configuration for one scored game.
#[derive(Debug, Clone, PartialEq, Getters, Serialize, Deserialize)]
pub struct ScorecardConfig {
    /// Game being scored.
    game_id: String,

    /// Whether the scoring team is home or away.
    #[serde(default)]
    team_side: TeamSide,

    /// Batting order, leadoff first.
    #[serde(default)]
    lineup: Vec<String>,

    /// SQLite database file.
    #[serde(default = "default_database_path")]
    database_path: String,

    /// Whether runs scoring on an error count as runs batted in.
    #[serde(default = "default_credit_runs_on_error")]
    credit_runs_on_error: bool,

    /// Tracing filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    log_filter: String,
}

#[instrument]
fn default_database_path() -> String {
    "scorecard.db".to_string()
}

#[instrument]
fn default_credit_runs_on_error() -> bool {
    true
}

#[instrument]
fn default_log_filter() -> String {
    "info".to_string()
}

impl ScorecardConfig {
    /// Creates a configuration with defaults for everything but the game.
    #[instrument(skip(game_id), fields(game_id = %game_id))]
    pub fn new(game_id: String, team_side: TeamSide, lineup: Vec<String>) -> Self {
        Self {
            game_id,
            team_side,
            lineup,
            database_path: default_database_path(),
            credit_runs_on_error: default_credit_runs_on_error(),
            log_filter: default_log_filter(),
        }
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or the
    /// game id is blank.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let config = Self::from_toml(&content)?;
        info!(game_id = %config.game_id, lineup = config.lineup.len(), "Config loaded successfully");
        Ok(config)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the text is not valid configuration.
    #[instrument(skip(content))]
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        if config.game_id.trim().is_empty() {
            return Err(ConfigError::new("game_id must not be empty".to_string()));
        }
        Ok(config)
    }

    /// Overrides the database path.
    pub fn with_database_path(mut self, database_path: String) -> Self {
        self.database_path = database_path;
        self
    }

    /// Game identity and side for the engine.
    pub fn game_setup(&self) -> GameSetup {
        GameSetup::new(self.game_id.clone(), self.team_side)
    }

    /// RBI crediting rules.
    pub fn rbi_policy(&self) -> RbiPolicy {
        RbiPolicy {
            credit_runs_on_error: self.credit_runs_on_error,
        }
    }

    /// Configured lineup as a roster.
    pub fn roster(&self) -> FixedLineup {
        FixedLineup::from_names(&self.lineup)
    }

    /// Configured lineup as roster ids.
    pub fn lineup_ids(&self) -> Vec<RosterId> {
        self.roster().players().to_vec()
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
