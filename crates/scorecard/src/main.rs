//! Scorecard - Unified CLI
//!
//! Loads one game from its configuration and either reports on it or runs
//! the scoring console.

#![warn(missing_docs)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use scorecard::{LiveGame, PlayStore, Publishing, PushHub, ScorecardConfig, SqliteStore, render_state};
use scorecard_engine::reduce;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::State { config, db_path } => run_state(&config, db_path).await,
        Command::Replay { config, db_path } => run_replay(&config, db_path).await,
        Command::Session { config, db_path } => run_session(&config, db_path).await,
    }
}

/// Loads the configuration and starts tracing with its filter unless
/// `RUST_LOG` is set.
fn load_config(path: &Path, db_path: Option<String>) -> Result<ScorecardConfig> {
    let config = ScorecardConfig::from_file(path)
        .with_context(|| format!("loading {}", path.display()))?;
    let config = match db_path {
        Some(db_path) => config.with_database_path(db_path),
        None => config,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    Ok(config)
}

/// Opens the SQLite store, publishing writes to `hub`.
fn open_store(config: &ScorecardConfig, hub: &PushHub) -> Result<Publishing<SqliteStore>> {
    let store = SqliteStore::open(config.database_path().clone())
        .with_context(|| format!("opening {}", config.database_path()))?;
    Ok(Publishing::new(store, hub.clone()))
}

async fn load_game(config: &ScorecardConfig, store: Arc<dyn PlayStore>) -> Result<LiveGame> {
    let game = LiveGame::load(config.game_setup(), store, &config.roster(), config.rbi_policy())
        .await?;
    Ok(game)
}

/// Print the current game state
#[instrument(skip_all, fields(config_path = %config.display()))]
async fn run_state(config: &Path, db_path: Option<String>) -> Result<()> {
    let config = load_config(config, db_path)?;
    let hub = PushHub::new();
    let store = Arc::new(open_store(&config, &hub)?);
    let game = load_game(&config, store).await?;

    println!("{}", render_state(&game.current_state()));
    Ok(())
}

/// List every play with the state after it
#[instrument(skip_all, fields(config_path = %config.display()))]
async fn run_replay(config: &Path, db_path: Option<String>) -> Result<()> {
    let config = load_config(config, db_path)?;
    let hub = PushHub::new();
    let store = Arc::new(open_store(&config, &hub)?);
    let game = load_game(&config, store).await?;

    let events: Vec<_> = game.log().events().collect();
    info!(plays = events.len(), "Replaying game");
    for (i, event) in events.iter().enumerate() {
        let state = reduce(
            events[..=i].iter().copied(),
            game.lineup(),
            game.setup(),
            game.ephemeral(),
        );
        let id = event
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "#{} {} {}: {} ({})",
            id,
            event.half_inning(),
            event.batter_id,
            event.description,
            event.event_type
        );
        println!("    {}", render_state(&state));
    }
    Ok(())
}

/// Score the game interactively
#[instrument(skip_all, fields(config_path = %config.display()))]
async fn run_session(config: &Path, db_path: Option<String>) -> Result<()> {
    let config = load_config(config, db_path)?;
    let hub = PushHub::new();
    let store = Arc::new(open_store(&config, &hub)?);
    let mut game = load_game(&config, store).await?;
    game.connect(&hub).await?;

    info!(game_id = %config.game_id(), "Scoring session started");
    let input = tokio::io::BufReader::new(tokio::io::stdin());
    scorecard::run_session(&mut game, input, tokio::io::stdout()).await?;
    info!("Scoring session finished");
    Ok(())
}
