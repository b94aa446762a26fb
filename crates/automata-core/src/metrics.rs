//! Per-tick population metrics.
//!
//! After every commit the engine takes a [`Census`]: how many sites are in
//! each state of the rule's alphabet, what fraction of the arena that is, and
//! the mean and maximum age over age-eligible sites. A [`MetricsCollector`]
//! keeps the series, optionally bounded to the most recent entries.

use std::collections::VecDeque;
use std::num::NonZeroUsize;

use serde::Serialize;

/// Count of one state in a census.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateTally<S> {
    /// The state.
    pub state: S,
    /// Number of sites in it.
    pub count: usize,
    /// `count / sites`.
    pub fraction: f64,
}

/// Metrics record for one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Census<S> {
    /// Tick the record describes (0 is the initial configuration).
    pub tick: u64,
    /// Total number of sites.
    pub sites: usize,
    /// One entry per alphabet state, in alphabet order.
    pub tallies: Vec<StateTally<S>>,
    /// Mean age over age-eligible sites, 0 if there are none.
    pub mean_age: f64,
    /// Maximum age over all sites.
    pub max_age: u32,
}

impl<S: Copy + Eq> Census<S> {
    /// Tally `states` against `alphabet`.
    ///
    /// States outside `alphabet` are not tallied.
    #[allow(clippy::cast_precision_loss)]
    pub fn take<F>(tick: u64, alphabet: &[S], states: &[S], ages: &[u32], eligible: F) -> Self
    where
        F: Fn(S) -> bool,
    {
        let mut counts = vec![0_usize; alphabet.len()];
        let mut eligible_sites = 0_u64;
        let mut age_sum = 0_u64;
        let mut max_age = 0_u32;

        for (&state, &age) in states.iter().zip(ages) {
            if let Some(slot) = alphabet
                .iter()
                .position(|&s| s == state)
                .and_then(|i| counts.get_mut(i))
            {
                *slot = slot.saturating_add(1);
            }
            if eligible(state) {
                eligible_sites = eligible_sites.saturating_add(1);
                age_sum = age_sum.saturating_add(u64::from(age));
            }
            max_age = max_age.max(age);
        }

        let sites = states.len();
        let tallies = alphabet
            .iter()
            .zip(counts)
            .map(|(&state, count)| StateTally {
                state,
                count,
                fraction: if sites == 0 {
                    0.0
                } else {
                    count as f64 / sites as f64
                },
            })
            .collect();
        let mean_age = if eligible_sites == 0 {
            0.0
        } else {
            age_sum as f64 / eligible_sites as f64
        };

        Self {
            tick,
            sites,
            tallies,
            mean_age,
            max_age,
        }
    }

    /// Number of sites in `state`.
    pub fn count(&self, state: S) -> usize {
        self.tally(state).map_or(0, |t| t.count)
    }

    /// Fraction of sites in `state`.
    pub fn fraction(&self, state: S) -> f64 {
        self.tally(state).map_or(0.0, |t| t.fraction)
    }

    /// Whether every site is in `state`.
    pub fn is_uniform(&self, state: S) -> bool {
        self.count(state) == self.sites
    }

    fn tally(&self, state: S) -> Option<&StateTally<S>> {
        self.tallies.iter().find(|t| t.state == state)
    }
}

/// Rolling series of censuses.
#[derive(Debug, Clone)]
pub struct MetricsCollector<S> {
    series: VecDeque<Census<S>>,
    retention: Option<NonZeroUsize>,
}

impl<S> MetricsCollector<S> {
    /// Create a collector keeping at most `retention` records (all if `None`).
    pub const fn new(retention: Option<NonZeroUsize>) -> Self {
        Self {
            series: VecDeque::new(),
            retention,
        }
    }

    /// Append a census, dropping the oldest if over retention.
    pub fn record(&mut self, census: Census<S>) {
        if let Some(limit) = self.retention {
            while self.series.len() >= limit.get() {
                self.series.pop_front();
            }
        }
        self.series.push_back(census);
    }

    /// Most recent census.
    pub fn latest(&self) -> Option<&Census<S>> {
        self.series.back()
    }

    /// Retained censuses, oldest first.
    pub fn series(&self) -> impl Iterator<Item = &Census<S>> {
        self.series.iter()
    }

    /// Number of retained censuses.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Drop every retained census.
    pub fn clear(&mut self) {
        self.series.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use automata_types::LifeState;

    use super::*;

    const ALPHABET: [LifeState; 2] = [LifeState::Empty, LifeState::Alive];

    #[test]
    fn census_counts_fractions_and_ages() {
        let states = [
            LifeState::Alive,
            LifeState::Alive,
            LifeState::Empty,
            LifeState::Empty,
        ];
        let ages = [4, 2, 0, 0];
        let census = Census::take(7, &ALPHABET, &states, &ages, LifeState::is_alive);

        assert_eq!(census.tick, 7);
        assert_eq!(census.count(LifeState::Alive), 2);
        assert!((census.fraction(LifeState::Empty) - 0.5).abs() < f64::EPSILON);
        assert!((census.mean_age - 3.0).abs() < f64::EPSILON);
        assert_eq!(census.max_age, 4);
        assert!(!census.is_uniform(LifeState::Empty));
    }

    #[test]
    fn empty_population_has_zero_mean_age() {
        let states = [LifeState::Empty; 3];
        let census = Census::take(0, &ALPHABET, &states, &[0; 3], LifeState::is_alive);
        assert!(census.mean_age.abs() < f64::EPSILON);
        assert!(census.is_uniform(LifeState::Empty));
    }

    #[test]
    fn collector_retention_drops_oldest() {
        let mut collector = MetricsCollector::new(NonZeroUsize::new(2));
        for tick in 0..5 {
            let census = Census::take(tick, &ALPHABET, &[LifeState::Empty], &[0], |_| false);
            collector.record(census);
        }
        assert_eq!(collector.len(), 2);
        let ticks: Vec<u64> = collector.series().map(|c| c.tick).collect();
        assert_eq!(ticks, vec![3, 4]);
        assert_eq!(collector.latest().unwrap().tick, 4);
    }

    #[test]
    fn census_serializes_to_json() {
        let census = Census::take(1, &ALPHABET, &[LifeState::Alive], &[0], LifeState::is_alive);
        let json = serde_json::to_value(&census).unwrap();
        assert_eq!(json["tallies"][1]["state"], "alive");
        assert_eq!(json["tallies"][1]["count"], 1);
    }
}
