//! Line-oriented scoring console.
//!
//! ```text
//! play <type> [base=disposition ...] [at x,y]
//! out | run [n] | score <n> | undo | retry | state | help | quit
//! ```

use crate::live::{LiveGame, PlayInput};
use scorecard_engine::{
    Advancement, Base, DerivedGameState, Disposition, Dispositions, EventType, HitLocation,
    ParseError, ReviewRequest,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, instrument, warn};

/// Console help text.
pub const HELP: &str = "\
commands:
  play <type> [base=disposition ...] [at x,y]   record a play, e.g. `play single 2b=score 1b=3b at 30,40`
  out                                           record a defensive out
  run [n]                                       add opponent runs (default 1)
  score <n>                                     override our score
  undo                                          delete the latest play
  retry                                         resubmit failed plays
  state                                         show the game state
  quit                                          leave the session";

/// One parsed console command.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    /// Record a play.
    Play {
        /// Play type.
        event_type: EventType,
        /// Runner dispositions given on the line.
        dispositions: Dispositions,
        /// Contact location.
        location: Option<HitLocation>,
    },
    /// Record a defensive out.
    Out,
    /// Add opponent runs.
    Run(u32),
    /// Override our score.
    Score(u32),
    /// Delete the latest play.
    Undo,
    /// Resubmit failed plays.
    Retry,
    /// Show the game state.
    State,
    /// Show help.
    Help,
    /// Leave the session.
    Quit,
}

impl std::str::FromStr for ReplCommand {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        parse_command(line)
    }
}

/// Parses one console line.
///
/// # Errors
///
/// Returns [`ParseError`] for unknown commands or malformed arguments.
#[instrument]
pub fn parse_command(line: &str) -> Result<ReplCommand, ParseError> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Err(ParseError::new("Empty command"));
    };
    let rest: Vec<&str> = words.collect();

    match command.to_ascii_lowercase().as_str() {
        "play" | "p" => parse_play(&rest),
        "out" => Ok(ReplCommand::Out),
        "run" | "runs" => match rest.first() {
            Some(n) => Ok(ReplCommand::Run(parse_count(n)?)),
            None => Ok(ReplCommand::Run(1)),
        },
        "score" => match rest.first() {
            Some(n) => Ok(ReplCommand::Score(parse_count(n)?)),
            None => Err(ParseError::new("score needs a number")),
        },
        "undo" => Ok(ReplCommand::Undo),
        "retry" => Ok(ReplCommand::Retry),
        "state" | "s" => Ok(ReplCommand::State),
        "help" | "?" => Ok(ReplCommand::Help),
        "quit" | "exit" | "q" => Ok(ReplCommand::Quit),
        other => Err(ParseError::new(format!("Unknown command: '{}'", other))),
    }
}

fn parse_play(args: &[&str]) -> Result<ReplCommand, ParseError> {
    let Some((name, rest)) = args.split_first() else {
        return Err(ParseError::new("play needs a play type"));
    };
    let event_type = EventType::parse(name);
    let mut dispositions = Dispositions::new();
    let mut location = None;

    let mut iter = rest.iter();
    while let Some(arg) = iter.next() {
        if arg.eq_ignore_ascii_case("at") {
            let coords = iter
                .next()
                .ok_or_else(|| ParseError::new("'at' needs coordinates x,y"))?;
            location = Some(parse_location(coords)?);
        } else if let Some((base, disposition)) = arg.split_once('=') {
            let base: Base = base.parse()?;
            let disposition: Disposition = disposition.parse()?;
            if dispositions.insert(base, disposition).is_some() {
                return Err(ParseError::new(format!("Runner on {} given twice", base)));
            }
        } else {
            return Err(ParseError::new(format!("Unexpected argument: '{}'", arg)));
        }
    }

    Ok(ReplCommand::Play {
        event_type,
        dispositions,
        location,
    })
}

fn parse_location(text: &str) -> Result<HitLocation, ParseError> {
    let (x, y) = text
        .split_once(',')
        .ok_or_else(|| ParseError::new(format!("Coordinates must be x,y: '{}'", text)))?;
    let coord = |s: &str| {
        s.trim()
            .parse::<f64>()
            .map_err(|_| ParseError::new(format!("Invalid coordinate: '{}'", s)))
    };
    Ok(HitLocation::new(coord(x)?, coord(y)?))
}

fn parse_count(text: &str) -> Result<u32, ParseError> {
    text.parse::<u32>()
        .map_err(|_| ParseError::new(format!("Invalid number: '{}'", text)))
}

/// One-line summary of the game state.
pub fn render_state(state: &DerivedGameState) -> String {
    let role = if state.offense { "batting" } else { "fielding" };
    let batter = state
        .current_batter
        .as_ref()
        .map(|b| b.as_str())
        .unwrap_or("-");
    let line = state
        .line_score
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "{} {} ({}) | {} out | us {} - them {} | {} | up: {} | line: {}",
        state.half.label(),
        state.inning,
        role,
        state.outs,
        state.score,
        state.opponent_score,
        state.runners,
        batter,
        if line.is_empty() { "-" } else { &line },
    )
}

/// Lists what the operator must choose for a reviewed play.
pub fn render_review(review: &ReviewRequest) -> String {
    let mut text = format!("{} needs a disposition for every runner:", review.event_type());
    for opt in review.runners() {
        let choices = opt
            .candidates
            .iter()
            .map(Disposition::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        text.push_str(&format!("\n  {}={{{}}}  ({})", opt.base, choices, opt.runner));
    }
    text
}

/// Result of one console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Text to show; the session continues.
    Message(String),
    /// The session ends.
    Quit,
}

/// Executes one command against the game.
#[instrument(skip(game))]
pub async fn execute(game: &mut LiveGame, command: ReplCommand) -> Reply {
    let message = match command {
        ReplCommand::Play {
            event_type,
            dispositions,
            location,
        } => {
            if dispositions.is_empty()
                && let Ok(Advancement::Review(review)) = game.preview(&event_type)
                && !review.runners().is_empty()
            {
                return Reply::Message(render_review(&review));
            }
            let input = PlayInput {
                dispositions: (!dispositions.is_empty()).then_some(dispositions),
                location,
                batting_side: None,
            };
            match game.submit_play(event_type, input).await {
                Ok(event) => format!(
                    "recorded: {}\n{}",
                    event.description,
                    render_state(&game.current_state())
                ),
                Err(err) => format!("error: {}", err),
            }
        }
        ReplCommand::Out => match game.record_defensive_out() {
            Ok(state) => render_state(&state),
            Err(err) => format!("error: {}", err),
        },
        ReplCommand::Run(runs) => match game.record_opponent_runs(runs).await {
            Ok(total) => format!("opponent: {}", total),
            Err(err) => format!("error: {} (kept locally)", err),
        },
        ReplCommand::Score(score) => render_state(&game.update_score(score)),
        ReplCommand::Undo => match game.request_undo().await {
            Ok(id) => format!("undone play {}\n{}", id, render_state(&game.current_state())),
            Err(err) => format!("error: {}", err),
        },
        ReplCommand::Retry => match game.retry_failed().await {
            Ok(count) => format!("resubmitted {} play(s)", count),
            Err(err) => format!("error: {}", err),
        },
        ReplCommand::State => render_state(&game.current_state()),
        ReplCommand::Help => HELP.to_string(),
        ReplCommand::Quit => return Reply::Quit,
    };
    Reply::Message(message)
}

/// Runs the console until `quit` or end of input.
///
/// Waiting push items are applied before every command.
///
/// # Errors
///
/// Returns an I/O error if reading input or writing output fails.
#[instrument(skip_all, fields(game_id = %game.setup().game_id))]
pub async fn run_session<R, W>(game: &mut LiveGame, input: R, mut output: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    write_line(&mut output, &render_state(&game.current_state())).await?;

    while let Some(line) = lines.next_line().await? {
        if let Err(err) = game.drain_feed().await {
            warn!(error = %err, "Applying push items failed");
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let reply = match parse_command(line) {
            Ok(command) => execute(game, command).await,
            Err(err) => Reply::Message(format!("error: {}", err.message)),
        };
        match reply {
            Reply::Message(text) => write_line(&mut output, &text).await?,
            Reply::Quit => break,
        }
    }
    debug!("Session ended");
    Ok(())
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> std::io::Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}
