//! Site topologies: who neighbors whom.
//!
//! A [`Topology`] maps caller-facing site addresses onto a dense arena of
//! indices `0..site_count()` and yields the neighbor indices of every site.
//! Both implementations are immutable after construction.
//!
//! - [`ToroidalGrid`] -- `width x height` cells, Moore (8-cell) neighborhood,
//!   wrapping at every edge. Neighbors are computed arithmetically, which is
//!   the same as sliding a 3x3 kernel with a hollow center over the grid.
//! - [`AdjacencyGraph`] -- explicit vertex ids and undirected edges. Vertices
//!   live in an arena in insertion order; adjacency is stored as index lists.

use std::collections::BTreeMap;

use automata_types::{GridPos, VertexId};

/// Errors raised while constructing a topology.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    /// A grid dimension was zero, or the cell count does not fit in memory.
    #[error("invalid grid dimension {width}x{height}")]
    InvalidDimension {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// The same vertex id was listed twice.
    #[error("duplicate vertex id: {0}")]
    DuplicateVertex(VertexId),

    /// An edge references a vertex id that is not in the vertex set.
    #[error("edge {from} -- {to} references an unknown vertex")]
    DanglingEdge {
        /// First endpoint.
        from: VertexId,
        /// Second endpoint.
        to: VertexId,
    },

    /// An edge joins a vertex to itself.
    #[error("self-loop on vertex {0}")]
    SelfLoop(VertexId),
}

/// A fixed neighbor structure over a dense arena of sites.
///
/// `neighbors` must be stable (the same sequence on every call) and total:
/// every index below [`site_count`](Topology::site_count) has at least one
/// neighbor unless the topology has a single site. Indices outside the arena
/// yield no neighbors.
pub trait Topology: Send + Sync {
    /// Caller-facing address of a site.
    type Site: Copy + Eq + core::fmt::Debug + core::fmt::Display + Send + Sync;

    /// Iterator over the neighbor indices of one site.
    type Neighbors<'a>: Iterator<Item = usize> + 'a
    where
        Self: 'a;

    /// Number of sites in the arena.
    fn site_count(&self) -> usize;

    /// Translate an address into its arena index.
    fn index_of(&self, site: Self::Site) -> Option<usize>;

    /// Translate an arena index back into its address.
    fn site_at(&self, index: usize) -> Option<Self::Site>;

    /// Neighbor indices of the site at `index`.
    fn neighbors(&self, index: usize) -> Self::Neighbors<'_>;
}

// ---------------------------------------------------------------------------
// Toroidal grid
// ---------------------------------------------------------------------------

/// Relative offsets of the Moore neighborhood, row by row.
const MOORE_OFFSETS: [(i8, i8); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// A `width x height` grid whose edges wrap around.
///
/// Cells are stored row-major: index `y * width + x`. On grids narrower or
/// shorter than three cells several offsets land on the same neighbor; such
/// neighbors are counted once per offset, exactly as a wrapping 3x3
/// convolution would count them. Offsets that land back on the cell itself
/// are skipped, so no cell is its own neighbor and a 1x1 grid has none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToroidalGrid {
    width: u32,
    height: u32,
    cells: usize,
}

impl ToroidalGrid {
    /// Create a grid.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::InvalidDimension`] if either dimension is
    /// zero or the cell count overflows `usize`.
    pub fn new(width: u32, height: u32) -> Result<Self, TopologyError> {
        let invalid = TopologyError::InvalidDimension { width, height };
        if width == 0 || height == 0 {
            return Err(invalid);
        }
        let cells = (width as usize)
            .checked_mul(height as usize)
            .ok_or(invalid)?;
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Grid width in cells.
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Arena index of `(x, y)` without bounds checking against the grid.
    const fn raw_index(&self, x: u32, y: u32) -> usize {
        // Both factors were bounded by the constructor's checked_mul.
        (y as usize)
            .saturating_mul(self.width as usize)
            .saturating_add(x as usize)
    }

    /// Decompose an arena index into `(x, y)`.
    fn coords(&self, index: usize) -> Option<(u32, u32)> {
        if index >= self.cells {
            return None;
        }
        let width = self.width as usize;
        let x = index.checked_rem(width)?;
        let y = index.checked_div(width)?;
        Some((u32::try_from(x).ok()?, u32::try_from(y).ok()?))
    }
}

/// Step `coord` by `delta` in `{-1, 0, 1}`, wrapping inside `0..extent`.
const fn wrap_step(coord: u32, delta: i8, extent: u32) -> u32 {
    match delta {
        -1 => {
            if coord == 0 {
                extent.saturating_sub(1)
            } else {
                coord.saturating_sub(1)
            }
        }
        1 => {
            let next = coord.saturating_add(1);
            if next >= extent { 0 } else { next }
        }
        _ => coord,
    }
}

/// Moore neighbors of one grid cell.
#[derive(Debug, Clone)]
pub struct MooreNeighbors {
    center: usize,
    cells: [usize; 8],
    cursor: usize,
    len: usize,
}

impl Iterator for MooreNeighbors {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.cursor < self.len {
            let candidate = self.cells.get(self.cursor).copied();
            self.cursor = self.cursor.saturating_add(1);
            match candidate {
                Some(index) if index != self.center => return Some(index),
                _ => {}
            }
        }
        None
    }
}

impl Topology for ToroidalGrid {
    type Site = GridPos;
    type Neighbors<'a> = MooreNeighbors;

    fn site_count(&self) -> usize {
        self.cells
    }

    fn index_of(&self, site: GridPos) -> Option<usize> {
        if site.x < self.width && site.y < self.height {
            Some(self.raw_index(site.x, site.y))
        } else {
            None
        }
    }

    fn site_at(&self, index: usize) -> Option<GridPos> {
        self.coords(index).map(|(x, y)| GridPos::new(x, y))
    }

    fn neighbors(&self, index: usize) -> MooreNeighbors {
        let mut cells = [0_usize; 8];
        let Some((x, y)) = self.coords(index) else {
            return MooreNeighbors {
                center: index,
                cells,
                cursor: 0,
                len: 0,
            };
        };
        for (slot, &(dx, dy)) in cells.iter_mut().zip(MOORE_OFFSETS.iter()) {
            let nx = wrap_step(x, dx, self.width);
            let ny = wrap_step(y, dy, self.height);
            *slot = self.raw_index(nx, ny);
        }
        MooreNeighbors {
            center: index,
            cells,
            cursor: 0,
            len: MOORE_OFFSETS.len(),
        }
    }
}

// ---------------------------------------------------------------------------
// Arbitrary graph
// ---------------------------------------------------------------------------

/// An undirected graph over caller-chosen vertex ids.
///
/// Adjacency is symmetric by construction. Repeating an edge (in either
/// direction) has no further effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjacencyGraph {
    /// Vertex ids in arena order.
    ids: Vec<VertexId>,
    /// Reverse lookup: id -> arena index.
    index: BTreeMap<VertexId, usize>,
    /// Neighbor indices per arena index.
    adjacency: Vec<Vec<usize>>,
    /// Number of distinct undirected edges.
    edge_count: usize,
}

impl AdjacencyGraph {
    /// Build a graph from a vertex list and an edge list.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::DuplicateVertex`] for a repeated id,
    /// [`TopologyError::DanglingEdge`] if an edge names an unknown id, and
    /// [`TopologyError::SelfLoop`] if an edge joins a vertex to itself.
    pub fn new<V, E>(vertices: V, edges: E) -> Result<Self, TopologyError>
    where
        V: IntoIterator<Item = VertexId>,
        E: IntoIterator<Item = (VertexId, VertexId)>,
    {
        let mut ids = Vec::new();
        let mut index = BTreeMap::new();
        for id in vertices {
            if index.insert(id, ids.len()).is_some() {
                return Err(TopologyError::DuplicateVertex(id));
            }
            ids.push(id);
        }

        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); ids.len()];
        let mut edge_count: usize = 0;
        for (from, to) in edges {
            let (Some(&a), Some(&b)) = (index.get(&from), index.get(&to)) else {
                return Err(TopologyError::DanglingEdge { from, to });
            };
            if a == b {
                return Err(TopologyError::SelfLoop(from));
            }
            let already = adjacency.get(a).is_some_and(|list| list.contains(&b));
            if already {
                continue;
            }
            if let Some(list) = adjacency.get_mut(a) {
                list.push(b);
            }
            if let Some(list) = adjacency.get_mut(b) {
                list.push(a);
            }
            edge_count = edge_count.saturating_add(1);
        }

        Ok(Self {
            ids,
            index,
            adjacency,
            edge_count,
        })
    }

    /// Vertex ids in arena order.
    pub fn vertex_ids(&self) -> &[VertexId] {
        &self.ids
    }

    /// Number of distinct undirected edges.
    pub const fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Number of neighbors of the vertex at `index` (0 when out of range).
    pub fn degree(&self, index: usize) -> usize {
        self.adjacency.get(index).map_or(0, Vec::len)
    }

    /// Whether `a` and `b` share an edge.
    pub fn adjacent(&self, a: VertexId, b: VertexId) -> bool {
        match (self.index.get(&a), self.index.get(&b)) {
            (Some(&ia), Some(ib)) => self.adjacency.get(ia).is_some_and(|list| list.contains(ib)),
            _ => false,
        }
    }
}

impl Topology for AdjacencyGraph {
    type Site = VertexId;
    type Neighbors<'a> = core::iter::Copied<core::slice::Iter<'a, usize>>;

    fn site_count(&self) -> usize {
        self.ids.len()
    }

    fn index_of(&self, site: VertexId) -> Option<usize> {
        self.index.get(&site).copied()
    }

    fn site_at(&self, index: usize) -> Option<VertexId> {
        self.ids.get(index).copied()
    }

    fn neighbors(&self, index: usize) -> Self::Neighbors<'_> {
        self.adjacency
            .get(index)
            .map_or(&[][..], Vec::as_slice)
            .iter()
            .copied()
    }
}
