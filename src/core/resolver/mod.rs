pub mod fixed;
#[cfg(feature = "vision")]
pub mod vision;

pub use fixed::FixedResolver;
#[cfg(feature = "vision")]
pub use vision::VisionResolver;

use crate::core::reason::Reason;
use crate::core::templates::DEFAULT_MATCH_THRESHOLD;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Player,
    Banker,
}

impl Side {
    /// Parses the wire name; matching is case-sensitive.
    pub fn parse(name: &str) -> Option<Side> {
        match name {
            "Player" => Some(Side::Player),
            "Banker" => Some(Side::Banker),
            _ => None,
        }
    }

    pub fn other(self) -> Side {
        match self {
            Side::Player => Side::Banker,
            Side::Banker => Side::Player,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Player => write!(f, "Player"),
            Side::Banker => write!(f, "Banker"),
        }
    }
}

/// Where to click, and how sure the lookup is about it.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedTarget {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    /// Match score for live lookups, `None` for stored positions.
    pub confidence: Option<f32>,
    /// Desktop point handed to the actuator.
    pub point: (i32, i32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolverKind {
    Fixed,
    Vision,
}

impl ResolverKind {
    pub fn chip_absent(self) -> Reason {
        match self {
            ResolverKind::Fixed => Reason::ChipNotFound,
            ResolverKind::Vision => Reason::NoChipsFound,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct VisionSettings {
    pub threshold: f32,
    pub scales: Vec<f32>,
    /// Bottom fraction of the frame searched for chips.
    pub chip_roi: f32,
}

impl Default for VisionSettings {
    fn default() -> Self {
        VisionSettings {
            threshold: DEFAULT_MATCH_THRESHOLD,
            scales: vec![1.0],
            chip_roi: 0.5,
        }
    }
}

pub trait PositionResolver {
    fn kind(&self) -> ResolverKind;

    /// Called once at the start of every engine operation.
    fn begin(&mut self) {}

    fn is_configured(&self) -> bool;

    /// Chip amounts this resolver can look up.
    fn denominations(&self) -> Vec<u64>;

    fn resolve_area(&self, side: Side) -> Option<ResolvedTarget>;

    fn resolve_chip(&self, amount: u64) -> Option<ResolvedTarget>;

    fn resolve_cancel(&self) -> Result<ResolvedTarget, Reason>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Player", Some(Side::Player))]
    #[case("Banker", Some(Side::Banker))]
    #[case("player", None)]
    #[case("Tie", None)]
    #[case("", None)]
    fn test_side_parse(#[case] name: &str, #[case] expected: Option<Side>) {
        assert_eq!(Side::parse(name), expected);
    }

    #[test]
    fn test_side_round_trip() {
        for side in [Side::Player, Side::Banker] {
            assert_eq!(Side::parse(&side.to_string()), Some(side));
            assert_eq!(side.other().other(), side);
        }
    }
}
