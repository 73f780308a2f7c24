//! Field zone classification for batted-ball contact.
//!
//! Coordinates live in a normalized 0-100 space with home plate at
//! (50, 100) and the outfield toward y = 0. The foul lines leave home
//! plate at 45 degrees, so a point is fair when `|x - 50| <= 100 - y`.

use crate::event::EventType;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, instrument};

const HOME_X: f64 = 50.0;
const HOME_Y: f64 = 100.0;

/// Home-run contact is pulled into this band so it lands on an outfielder.
const HOME_RUN_Y_FLOOR: f64 = 0.0;
const HOME_RUN_Y_CEILING: f64 = 40.0;

/// Named fielding zone, one per defensive position plus the foul sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::EnumIter)]
#[serde(try_from = "String", into = "String")]
pub enum FieldZone {
    /// Pitcher (1).
    Pitcher,
    /// Catcher (2).
    Catcher,
    /// First base (3).
    FirstBase,
    /// Second base (4).
    SecondBase,
    /// Third base (5).
    ThirdBase,
    /// Shortstop (6).
    Shortstop,
    /// Left field (7).
    LeftField,
    /// Center field (8).
    CenterField,
    /// Right field (9).
    RightField,
    /// Contact outside the foul lines. Carries no fielding attribution.
    Foul,
}

impl FieldZone {
    /// Infield positions, used for ground balls.
    pub const INFIELD: [FieldZone; 6] = [
        FieldZone::Pitcher,
        FieldZone::Catcher,
        FieldZone::FirstBase,
        FieldZone::SecondBase,
        FieldZone::ThirdBase,
        FieldZone::Shortstop,
    ];

    /// Outfield positions, used for home runs.
    pub const OUTFIELD: [FieldZone; 3] = [
        FieldZone::LeftField,
        FieldZone::CenterField,
        FieldZone::RightField,
    ];

    /// Every fielding position.
    pub const FIELDERS: [FieldZone; 9] = [
        FieldZone::Pitcher,
        FieldZone::Catcher,
        FieldZone::FirstBase,
        FieldZone::SecondBase,
        FieldZone::ThirdBase,
        FieldZone::Shortstop,
        FieldZone::LeftField,
        FieldZone::CenterField,
        FieldZone::RightField,
    ];

    /// Display label; the foul sentinel is `"foul ball"`.
    pub fn label(self) -> &'static str {
        match self {
            FieldZone::Pitcher => "pitcher",
            FieldZone::Catcher => "catcher",
            FieldZone::FirstBase => "first base",
            FieldZone::SecondBase => "second base",
            FieldZone::ThirdBase => "third base",
            FieldZone::Shortstop => "shortstop",
            FieldZone::LeftField => "left field",
            FieldZone::CenterField => "center field",
            FieldZone::RightField => "right field",
            FieldZone::Foul => "foul ball",
        }
    }

    /// Scorer's position number (1-9), `None` for foul.
    pub fn position_number(self) -> Option<u8> {
        match self {
            FieldZone::Pitcher => Some(1),
            FieldZone::Catcher => Some(2),
            FieldZone::FirstBase => Some(3),
            FieldZone::SecondBase => Some(4),
            FieldZone::ThirdBase => Some(5),
            FieldZone::Shortstop => Some(6),
            FieldZone::LeftField => Some(7),
            FieldZone::CenterField => Some(8),
            FieldZone::RightField => Some(9),
            FieldZone::Foul => None,
        }
    }

    /// Centroid of the zone in field coordinates.
    fn centroid(self) -> Option<(f64, f64)> {
        match self {
            FieldZone::Pitcher => Some((50.0, 66.0)),
            FieldZone::Catcher => Some((50.0, 94.0)),
            FieldZone::FirstBase => Some((68.0, 66.0)),
            FieldZone::SecondBase => Some((60.0, 52.0)),
            FieldZone::ThirdBase => Some((32.0, 66.0)),
            FieldZone::Shortstop => Some((40.0, 52.0)),
            FieldZone::LeftField => Some((24.0, 30.0)),
            FieldZone::CenterField => Some((50.0, 16.0)),
            FieldZone::RightField => Some((76.0, 30.0)),
            FieldZone::Foul => None,
        }
    }

    /// The zone as a fielding attribution; foul balls attribute to nobody.
    pub fn attribution(self) -> Option<FieldZone> {
        (self != FieldZone::Foul).then_some(self)
    }
}

impl std::fmt::Display for FieldZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FieldZone {
    type Err = crate::types::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', " ");
        <FieldZone as strum::IntoEnumIterator>::iter()
            .find(|zone| zone.label() == wanted)
            .ok_or_else(|| crate::types::ParseError::new(format!("Invalid field zone: '{}'", s)))
    }
}

impl TryFrom<String> for FieldZone {
    type Error = crate::types::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FieldZone> for String {
    fn from(zone: FieldZone) -> Self {
        zone.label().to_string()
    }
}

/// Checks whether a point lies in fair territory.
pub fn is_fair(x: f64, y: f64) -> bool {
    let in_bounds = (0.0..=100.0).contains(&x) && (0.0..=100.0).contains(&y);
    in_bounds && (x - HOME_X).abs() <= HOME_Y - y
}

/// Classifies contact at `(x, y)` for the given play into a fielding zone.
///
/// Home runs are clamped into the outfield band and always attribute to an
/// outfielder. Ground outs only consider infielders. Any other contact
/// outside the foul lines returns [`FieldZone::Foul`].
#[instrument]
pub fn classify(x: f64, y: f64, event_type: &EventType) -> FieldZone {
    if *event_type == EventType::HomeRun {
        let x = if x.is_finite() { x.clamp(0.0, 100.0) } else { HOME_X };
        let y = if y.is_finite() {
            y.clamp(HOME_RUN_Y_FLOOR, HOME_RUN_Y_CEILING)
        } else {
            HOME_RUN_Y_FLOOR
        };
        return nearest(x, y, &FieldZone::OUTFIELD);
    }

    if !is_fair(x, y) {
        debug!(x, y, "Contact outside the foul lines");
        return FieldZone::Foul;
    }

    let candidates: &[FieldZone] = match event_type {
        EventType::GroundOut => &FieldZone::INFIELD,
        _ => &FieldZone::FIELDERS,
    };
    nearest(x, y, candidates)
}

fn nearest(x: f64, y: f64, candidates: &[FieldZone]) -> FieldZone {
    candidates
        .iter()
        .filter_map(|zone| {
            zone.centroid()
                .map(|(cx, cy)| (*zone, (cx - x).powi(2) + (cy - y).powi(2)))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(zone, _)| zone)
        .unwrap_or(FieldZone::Foul)
}
