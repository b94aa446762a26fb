//! Site addresses.
//!
//! A site is identified by a stable address that topologies translate into a
//! dense arena index. Grids use `(x, y)` coordinates, graphs use the vertex
//! ids supplied at construction.

use serde::{Deserialize, Serialize};

/// A cell coordinate on a toroidal grid.
///
/// `x` runs along the width, `y` along the height. Both are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridPos {
    /// Column index.
    pub x: u32,
    /// Row index.
    pub y: u32,
}

impl GridPos {
    /// Create a coordinate from its column and row.
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl core::fmt::Display for GridPos {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(u32, u32)> for GridPos {
    fn from((x, y): (u32, u32)) -> Self {
        Self { x, y }
    }
}

/// Caller-chosen identifier of a graph vertex.
///
/// Ids need not be dense or ordered; the graph topology maps them onto
/// arena indices in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VertexId(pub u64);

impl VertexId {
    /// Return the inner integer value.
    pub const fn into_inner(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for VertexId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl From<u64> for VertexId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<VertexId> for u64 {
    fn from(id: VertexId) -> Self {
        id.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn vertex_id_serializes_as_bare_integer() {
        let json = serde_json::to_string(&VertexId(17)).unwrap();
        assert_eq!(json, "17");
        let back: VertexId = serde_json::from_str("17").unwrap();
        assert_eq!(back, VertexId(17));
    }

    #[test]
    fn grid_pos_orders_by_column_then_row() {
        assert!(GridPos::new(0, 5) < GridPos::new(1, 0));
        assert!(GridPos::new(2, 1) < GridPos::new(2, 3));
    }

    #[test]
    fn grid_pos_display() {
        assert_eq!(GridPos::from((3, 4)).to_string(), "(3, 4)");
    }
}
