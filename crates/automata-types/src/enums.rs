//! State alphabets for the three rule families.
//!
//! Each alphabet is a small closed set. Variants derive `Ord` so that census
//! tables and metric series iterate in a stable order.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Life-with-age
// ---------------------------------------------------------------------------

/// State of a cell under the binary Life-with-age rule.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LifeState {
    /// No organism occupies the cell.
    #[default]
    Empty,
    /// A living organism occupies the cell.
    Alive,
}

impl LifeState {
    /// Return the opposite state (used by click-to-toggle edits).
    pub const fn toggled(self) -> Self {
        match self {
            Self::Empty => Self::Alive,
            Self::Alive => Self::Empty,
        }
    }

    /// Whether the cell is alive.
    pub const fn is_alive(self) -> bool {
        matches!(self, Self::Alive)
    }
}

impl From<bool> for LifeState {
    fn from(alive: bool) -> Self {
        if alive { Self::Alive } else { Self::Empty }
    }
}

impl core::fmt::Display for LifeState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Empty => f.write_str("empty"),
            Self::Alive => f.write_str("alive"),
        }
    }
}

// ---------------------------------------------------------------------------
// Predator-prey
// ---------------------------------------------------------------------------

/// Occupant of a cell under the predator-prey rule.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    /// Unoccupied cell.
    #[default]
    Empty,
    /// Prey organism; reproduces by Life-like birth/survival sets.
    Prey,
    /// Predator organism; converts adjacent prey, starves without them.
    Predator,
}

impl core::fmt::Display for Species {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Empty => f.write_str("empty"),
            Self::Prey => f.write_str("prey"),
            Self::Predator => f.write_str("predator"),
        }
    }
}

// ---------------------------------------------------------------------------
// Faction control
// ---------------------------------------------------------------------------

/// Allegiance of a vertex under the faction-control rule.
///
/// Factions are numbered from zero; the rule configuration decides how many
/// exist and what they are called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Allegiance {
    /// Loyal to the faction with this index.
    Faction(u8),
    /// Belongs to no faction.
    Barbarian,
}

impl Allegiance {
    /// Return the faction index, or `None` for barbarians.
    pub const fn faction(self) -> Option<u8> {
        match self {
            Self::Faction(index) => Some(index),
            Self::Barbarian => None,
        }
    }

    /// Whether the vertex is barbarian.
    pub const fn is_barbarian(self) -> bool {
        matches!(self, Self::Barbarian)
    }
}

impl core::fmt::Display for Allegiance {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Faction(index) => write!(f, "faction-{index}"),
            Self::Barbarian => f.write_str("barbarian"),
        }
    }
}
