//! Neighbor aggregation.
//!
//! Before any site is evaluated, the engine counts, for every site, how many
//! of its neighbors carry each classification label of the active rule
//! ("alive", "prey", "faction 2", ...). Counts are rebuilt from scratch every
//! tick from the pre-tick snapshot; nothing is updated incrementally.
//!
//! Labels are mutually exclusive (a state maps to at most one label), so a
//! single pass over the neighbor structure fills every label at once.

use rayon::prelude::*;

use crate::engine::Execution;
use crate::topology::Topology;

/// Per-site neighbor counts, one row of `labels` counters per site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborCounts {
    labels: usize,
    counts: Vec<u32>,
}

impl NeighborCounts {
    /// Allocate zeroed counters for `sites` sites and `labels` labels.
    pub fn new(sites: usize, labels: usize) -> Self {
        Self {
            labels,
            counts: vec![0; sites.saturating_mul(labels)],
        }
    }

    /// Number of labels per site.
    pub const fn labels(&self) -> usize {
        self.labels
    }

    /// The counter row of `site`; empty if the site is out of range.
    pub fn of(&self, site: usize) -> &[u32] {
        let start = site.saturating_mul(self.labels);
        let end = start.saturating_add(self.labels);
        self.counts.get(start..end).unwrap_or(&[])
    }

    /// Count of neighbors of `site` carrying `label`.
    pub fn count(&self, site: usize, label: usize) -> u32 {
        self.of(site).get(label).copied().unwrap_or(0)
    }

    /// Rebuild every row from `snapshot`.
    ///
    /// `classify` maps a state to its label, or `None` if the state carries
    /// no label. `snapshot` must hold one state per site of `topology`.
    pub fn recompute<T, S, F>(
        &mut self,
        topology: &T,
        snapshot: &[S],
        classify: F,
        execution: Execution,
    ) where
        T: Topology,
        S: Copy + Sync,
        F: Fn(S) -> Option<usize> + Sync,
    {
        if self.labels == 0 {
            return;
        }
        let fill = |(site, row): (usize, &mut [u32])| {
            row.fill(0);
            for neighbor in topology.neighbors(site) {
                let Some(label) = snapshot.get(neighbor).copied().and_then(&classify) else {
                    continue;
                };
                if let Some(slot) = row.get_mut(label) {
                    *slot = slot.saturating_add(1);
                }
            }
        };
        match execution {
            Execution::Sequential => self
                .counts
                .chunks_mut(self.labels)
                .enumerate()
                .for_each(fill),
            Execution::Parallel => self
                .counts
                .par_chunks_mut(self.labels)
                .enumerate()
                .for_each(fill),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use automata_types::{GridPos, LifeState};

    use super::*;
    use crate::topology::ToroidalGrid;

    fn alive(state: LifeState) -> Option<usize> {
        state.is_alive().then_some(0)
    }

    #[test]
    fn counts_live_neighbors_with_wraparound() {
        let grid = ToroidalGrid::new(4, 4).unwrap();
        let mut snapshot = vec![LifeState::Empty; grid.site_count()];
        for pos in [GridPos::new(3, 3), GridPos::new(1, 0), GridPos::new(2, 2)] {
            snapshot[grid.index_of(pos).unwrap()] = LifeState::Alive;
        }
        let mut counts = NeighborCounts::new(grid.site_count(), 1);
        counts.recompute(&grid, &snapshot, alive, Execution::Sequential);

        let origin = grid.index_of(GridPos::new(0, 0)).unwrap();
        // (3,3) wraps diagonally, (1,0) is adjacent, (2,2) is two cells away.
        assert_eq!(counts.count(origin, 0), 2);
    }

    #[test]
    fn recompute_overwrites_previous_counts() {
        let grid = ToroidalGrid::new(3, 3).unwrap();
        let mut snapshot = vec![LifeState::Alive; grid.site_count()];
        let mut counts = NeighborCounts::new(grid.site_count(), 1);
        counts.recompute(&grid, &snapshot, alive, Execution::Sequential);
        assert_eq!(counts.count(4, 0), 8);

        snapshot.fill(LifeState::Empty);
        counts.recompute(&grid, &snapshot, alive, Execution::Sequential);
        assert_eq!(counts.count(4, 0), 0);
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let grid = ToroidalGrid::new(9, 7).unwrap();
        let snapshot: Vec<LifeState> = (0..grid.site_count())
            .map(|i| LifeState::from(i % 3 == 0 || i % 7 == 1))
            .collect();
        let mut serial = NeighborCounts::new(grid.site_count(), 1);
        let mut parallel = NeighborCounts::new(grid.site_count(), 1);
        serial.recompute(&grid, &snapshot, alive, Execution::Sequential);
        parallel.recompute(&grid, &snapshot, alive, Execution::Parallel);
        assert_eq!(serial, parallel);
    }

    #[test]
    fn out_of_range_site_reads_zero() {
        let counts = NeighborCounts::new(2, 3);
        assert!(counts.of(5).is_empty());
        assert_eq!(counts.count(1, 7), 0);
    }
}
