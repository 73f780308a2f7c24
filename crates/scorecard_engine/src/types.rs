//! Core domain types: half-innings, bases, runners.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::instrument;

/// Identifier of a roster entry (a batter, and later a base runner).
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct RosterId(String);

impl RosterId {
    /// Creates a roster id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RosterId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Which half of an inning is being played.
///
/// `Top` is the visiting team's turn at bat, `Bottom` the home team's.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
pub enum Half {
    /// Visiting team bats.
    Top,
    /// Home team bats.
    Bottom,
}

impl Half {
    /// Returns the other half.
    pub fn flip(self) -> Self {
        match self {
            Half::Top => Half::Bottom,
            Half::Bottom => Half::Top,
        }
    }

    /// Label used in storage and display.
    pub fn label(self) -> &'static str {
        match self {
            Half::Top => "top",
            Half::Bottom => "bottom",
        }
    }
}

impl std::fmt::Display for Half {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Half {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(Half::Top),
            "bottom" => Ok(Half::Bottom),
            other => Err(ParseError::new(format!("Invalid half: '{}'", other))),
        }
    }
}

/// Whether the scoring team is the home or the visiting side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamSide {
    /// Scoring team bats in the bottom half.
    Home,
    /// Scoring team bats in the top half.
    #[default]
    Away,
}

impl TeamSide {
    /// Returns the half in which this side bats.
    pub fn batting_half(self) -> Half {
        match self {
            TeamSide::Home => Half::Bottom,
            TeamSide::Away => Half::Top,
        }
    }
}

/// Highest inning number a play may carry. Records beyond it are treated as
/// corrupt.
pub const MAX_INNING: u32 = 99;

/// A specific half-inning, ordered chronologically.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, derive_new::new,
)]
pub struct HalfInning {
    /// Inning number, starting at 1.
    pub inning: u32,
    /// Half within the inning.
    pub half: Half,
}

impl HalfInning {
    /// The first half-inning of a game.
    pub const OPENING: HalfInning = HalfInning {
        inning: 1,
        half: Half::Top,
    };

    /// Returns the half-inning that follows this one.
    #[instrument]
    pub fn next(self) -> Self {
        match self.half {
            Half::Top => Self::new(self.inning, Half::Bottom),
            Half::Bottom => Self::new(self.inning.saturating_add(1), Half::Top),
        }
    }

    /// True for innings 1 through [`MAX_INNING`].
    pub fn is_valid(self) -> bool {
        (1..=MAX_INNING).contains(&self.inning)
    }
}

impl std::fmt::Display for HalfInning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.half, self.inning)
    }
}

/// One of the three bases a runner can occupy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
pub enum Base {
    /// First base.
    First,
    /// Second base.
    Second,
    /// Third base.
    Third,
}

impl Base {
    /// All bases, lead runner last.
    pub const ALL: [Base; 3] = [Base::First, Base::Second, Base::Third];

    /// All bases, lead runner first.
    pub const LEAD_FIRST: [Base; 3] = [Base::Third, Base::Second, Base::First];

    /// Base number (1-3).
    pub fn number(self) -> u8 {
        match self {
            Base::First => 1,
            Base::Second => 2,
            Base::Third => 3,
        }
    }

    /// Creates a base from its number (1-3).
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Base::First),
            2 => Some(Base::Second),
            3 => Some(Base::Third),
            _ => None,
        }
    }

    /// The next base toward home, or `None` from third.
    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    /// Bases strictly ahead of this one.
    pub fn ahead(self) -> impl Iterator<Item = Base> {
        Base::ALL.into_iter().filter(move |b| *b > self)
    }

    /// Short label ("first", "second", "third").
    pub fn label(self) -> &'static str {
        match self {
            Base::First => "first",
            Base::Second => "second",
            Base::Third => "third",
        }
    }
}

impl std::fmt::Display for Base {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Base {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "1b" | "1" => Ok(Base::First),
            "second" | "2b" | "2" => Ok(Base::Second),
            "third" | "3b" | "3" => Ok(Base::Third),
            other => Err(ParseError::new(format!("Invalid base: '{}'", other))),
        }
    }
}

/// Runner occupancy of the three bases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BaseState {
    /// Runner on first, if any.
    pub first: Option<RosterId>,
    /// Runner on second, if any.
    pub second: Option<RosterId>,
    /// Runner on third, if any.
    pub third: Option<RosterId>,
}

impl BaseState {
    /// Creates empty bases.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the runner on the given base.
    pub fn get(&self, base: Base) -> Option<&RosterId> {
        match base {
            Base::First => self.first.as_ref(),
            Base::Second => self.second.as_ref(),
            Base::Third => self.third.as_ref(),
        }
    }

    fn slot(&mut self, base: Base) -> &mut Option<RosterId> {
        match base {
            Base::First => &mut self.first,
            Base::Second => &mut self.second,
            Base::Third => &mut self.third,
        }
    }

    /// Places (or clears) a runner on the given base.
    pub fn set(&mut self, base: Base, runner: Option<RosterId>) {
        *self.slot(base) = runner;
    }

    /// Removes and returns the runner on the given base.
    pub fn take(&mut self, base: Base) -> Option<RosterId> {
        self.slot(base).take()
    }

    /// Checks whether a base is occupied.
    pub fn is_occupied(&self, base: Base) -> bool {
        self.get(base).is_some()
    }

    /// Occupied bases, first base first.
    pub fn occupied(&self) -> Vec<Base> {
        Base::ALL
            .into_iter()
            .filter(|b| self.is_occupied(*b))
            .collect()
    }

    /// Number of runners on base.
    pub fn runner_count(&self) -> usize {
        self.occupied().len()
    }

    /// True when no base is occupied.
    pub fn is_empty(&self) -> bool {
        self.runner_count() == 0
    }

    /// Checks whether the same runner appears on two bases.
    pub fn has_duplicate_runner(&self) -> bool {
        let runners: Vec<&RosterId> = Base::ALL.iter().filter_map(|b| self.get(*b)).collect();
        runners
            .iter()
            .enumerate()
            .any(|(i, r)| runners[i + 1..].contains(r))
    }

    /// Encodes as flat text: `first|second|third`, empty segment for an empty base.
    ///
    /// Backslashes and `|` inside a runner id are escaped with a backslash.
    #[instrument(skip(self))]
    pub fn encode(&self) -> String {
        Base::ALL
            .iter()
            .map(|b| self.get(*b).map(|r| escape(r.as_str())).unwrap_or_default())
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Decodes the flat text produced by [`BaseState::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] unless the text has exactly three segments and
    /// every escape is complete.
    #[instrument]
    pub fn decode(text: &str) -> Result<Self, ParseError> {
        let mut segments: Vec<String> = vec![String::new()];
        let mut chars = text.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    let escaped = chars.next().ok_or_else(|| {
                        ParseError::new(format!("Dangling escape in base state: '{}'", text))
                    })?;
                    if let Some(segment) = segments.last_mut() {
                        segment.push(escaped);
                    }
                }
                '|' => segments.push(String::new()),
                other => {
                    if let Some(segment) = segments.last_mut() {
                        segment.push(other);
                    }
                }
            }
        }
        let count = segments.len();
        let Ok([first, second, third]) = <[String; 3]>::try_from(segments) else {
            return Err(ParseError::new(format!(
                "Base state must have 3 segments, got {}: '{}'",
                count, text
            )));
        };
        let runner = |s: String| (!s.is_empty()).then(|| RosterId::new(s));
        Ok(Self {
            first: runner(first),
            second: runner(second),
            third: runner(third),
        })
    }
}

fn escape(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for c in id.chars() {
        if matches!(c, '\\' | '|') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl std::fmt::Display for BaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let show = |b: Base| self.get(b).map(RosterId::as_str).unwrap_or("-").to_string();
        write!(
            f,
            "1B: {}, 2B: {}, 3B: {}",
            show(Base::First),
            show(Base::Second),
            show(Base::Third)
        )
    }
}

/// Failure to parse a domain value from text.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("Parse error: {}", message)]
pub struct ParseError {
    /// What could not be parsed.
    pub message: String,
}

impl ParseError {
    /// Creates a new parse error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
