//! The synchronous tick engine.
//!
//! An [`Automaton`] owns a topology, a transition rule, two state buffers and
//! the per-site bookkeeping. Each call to [`Automaton::advance`] runs one full
//! cycle:
//!
//! 1. **Aggregating** -- neighbor counts are rebuilt from the current buffer.
//! 2. **Evaluating** -- every site's next state is written to the staging
//!    buffer from the pre-tick snapshot, its counts, its age and its own
//!    keyed random stream.
//! 3. **Committing** -- the buffers are swapped, ages are folded in and a
//!    census is recorded.
//!
//! No site ever observes a value produced during the tick being evaluated,
//! so the result does not depend on evaluation order. Sequential and
//! parallel execution are interchangeable.
//!
//! Manual edits (`set_state`, `fill`, `reseed`, `reconfigure`) are only
//! accepted between ticks. A rule that panics mid-tick leaves the engine
//! outside [`Phase::Idle`] for good; every later call reports
//! [`EngineError::EngineBusy`].

use std::fmt;
use std::num::NonZeroUsize;

use automata_types::LifeState;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::age::AgeTracker;
use crate::aggregate::NeighborCounts;
use crate::metrics::{Census, MetricsCollector};
use crate::rng::RngStream;
use crate::rule::{RuleConfigError, SiteView, TransitionRule};
use crate::seeding::{InitialState, SeedingError};
use crate::topology::{Topology, TopologyError};

/// Errors from building or driving an engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// The topology could not be built.
    #[error("topology error: {0}")]
    Topology(#[from] TopologyError),

    /// The rule configuration is invalid.
    #[error("rule configuration error: {0}")]
    Rule(#[from] RuleConfigError),

    /// The initial configuration is invalid.
    #[error("seeding error: {0}")]
    Seeding(#[from] SeedingError),

    /// The engine is not between ticks.
    #[error("engine is busy in phase {phase}")]
    EngineBusy {
        /// The phase the engine is stuck in.
        phase: Phase,
    },

    /// A site reference does not belong to the topology.
    #[error("unknown site {0}")]
    UnknownSite(String),

    /// A state does not belong to the active rule's alphabet.
    #[error("state {state} is not valid for this rule")]
    StateRejected {
        /// Debug rendering of the rejected state.
        state: String,
    },

    /// The tick counter cannot advance further.
    #[error("tick counter overflow")]
    TickOverflow,

    /// The topology has no sites.
    #[error("topology has no sites")]
    EmptyTopology,
}

/// Where an engine is within its tick cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Between ticks; edits are allowed.
    Idle,
    /// Rebuilding neighbor counts.
    Aggregating,
    /// Computing staged next states.
    Evaluating,
    /// Swapping buffers and updating ages and metrics.
    Committing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Aggregating => "aggregating",
            Self::Evaluating => "evaluating",
            Self::Committing => "committing",
        };
        f.write_str(name)
    }
}

/// How per-site work inside a phase is scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Execution {
    /// One thread, arena order.
    #[default]
    Sequential,
    /// Spread across the rayon pool.
    Parallel,
}

/// Engine tuning that does not affect results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineOptions {
    /// Scheduling of aggregation and evaluation.
    pub execution: Execution,
    /// How many censuses to keep (all if `None`).
    pub metrics_retention: Option<NonZeroUsize>,
}

/// A synchronous cellular automaton over topology `T` driven by rule `R`.
#[derive(Debug)]
pub struct Automaton<T: Topology, R: TransitionRule> {
    topology: T,
    rule: R,
    stream: RngStream,
    tick: u64,
    /// Number of times the configuration has been drawn at random.
    generation: u64,
    phase: Phase,
    current: Vec<R::State>,
    staged: Vec<R::State>,
    ages: AgeTracker,
    counts: NeighborCounts,
    metrics: MetricsCollector<R::State>,
    options: EngineOptions,
}

impl<T: Topology, R: TransitionRule> Automaton<T, R> {
    /// Build an engine with default options.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the topology is empty or the initial
    /// configuration is invalid for `rule`.
    pub fn new(
        topology: T,
        rule: R,
        seed: u64,
        initial: InitialState<R::State>,
    ) -> Result<Self, EngineError> {
        Self::with_options(topology, rule, seed, initial, EngineOptions::default())
    }

    /// Build an engine with explicit options.
    ///
    /// The initial configuration is recorded as the census of tick 0.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the topology is empty or the initial
    /// configuration is invalid for `rule`.
    pub fn with_options(
        topology: T,
        rule: R,
        seed: u64,
        initial: InitialState<R::State>,
        options: EngineOptions,
    ) -> Result<Self, EngineError> {
        let sites = topology.site_count();
        if sites == 0 {
            return Err(EngineError::EmptyTopology);
        }
        let stream = RngStream::new(seed);
        let current = draw_states(&rule, sites, stream, 0, initial)?;
        let counts = NeighborCounts::new(sites, rule.label_count());

        let mut engine = Self {
            staged: current.clone(),
            current,
            topology,
            rule,
            stream,
            tick: 0,
            generation: 0,
            phase: Phase::Idle,
            ages: AgeTracker::new(sites),
            counts,
            metrics: MetricsCollector::new(options.metrics_retention),
            options,
        };
        let census = engine.census();
        engine.metrics.record(census);

        info!(
            rule = engine.rule.name(),
            sites,
            seed,
            execution = ?options.execution,
            "Automaton created"
        );
        Ok(engine)
    }

    /// Run one synchronous tick and return its census.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EngineBusy`] if the engine is not idle and
    /// [`EngineError::TickOverflow`] if the tick counter is exhausted.
    pub fn advance(&mut self) -> Result<Census<R::State>, EngineError> {
        self.ensure_idle()?;
        let next_tick = self.tick.checked_add(1).ok_or(EngineError::TickOverflow)?;
        let execution = self.options.execution;

        self.phase = Phase::Aggregating;
        trace!(tick = next_tick, "Aggregating neighbor counts");
        let rule = &self.rule;
        self.counts
            .recompute(&self.topology, &self.current, |s| rule.classify(s), execution);

        self.phase = Phase::Evaluating;
        trace!(tick = next_tick, "Evaluating sites");
        let stream = self.stream;
        let current = &self.current;
        let ages = self.ages.as_slice();
        let counts = &self.counts;
        let evaluate = |(site, slot): (usize, &mut R::State)| {
            if let Some(next) = evaluate_site(rule, stream, next_tick, current, ages, counts, site)
            {
                *slot = next;
            }
        };
        match execution {
            Execution::Sequential => self.staged.iter_mut().enumerate().for_each(evaluate),
            Execution::Parallel => self.staged.par_iter_mut().enumerate().for_each(evaluate),
        }

        self.phase = Phase::Committing;
        trace!(tick = next_tick, "Committing staged states");
        std::mem::swap(&mut self.current, &mut self.staged);
        let rule = &self.rule;
        self.ages
            .advance(&self.staged, &self.current, |s| rule.is_age_eligible(s));
        self.tick = next_tick;
        let census = self.census();
        self.phase = Phase::Idle;

        debug!(
            tick = next_tick,
            counts = ?census.tallies.iter().map(|t| t.count).collect::<Vec<_>>(),
            mean_age = census.mean_age,
            "Tick committed"
        );
        self.metrics.record(census.clone());
        Ok(census)
    }

    /// Run `ticks` ticks, returning the last census.
    ///
    /// # Errors
    ///
    /// Stops at the first failing tick and returns its error.
    pub fn advance_by(&mut self, ticks: u64) -> Result<Census<R::State>, EngineError> {
        let mut last = self.census();
        for _ in 0..ticks {
            last = self.advance()?;
        }
        Ok(last)
    }

    /// Current state of `site`.
    pub fn state_of(&self, site: T::Site) -> Option<R::State> {
        self.topology
            .index_of(site)
            .and_then(|i| self.current.get(i).copied())
    }

    /// Current age of `site`.
    pub fn age_of(&self, site: T::Site) -> Option<u32> {
        self.topology
            .index_of(site)
            .and_then(|i| self.ages.get(i))
    }

    /// Overwrite the state of one site between ticks. Its age resets to 0.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EngineBusy`] mid-tick,
    /// [`EngineError::UnknownSite`] for a foreign site and
    /// [`EngineError::StateRejected`] for a state outside the alphabet.
    pub fn set_state(&mut self, site: T::Site, state: R::State) -> Result<(), EngineError> {
        self.ensure_idle()?;
        let index = self.index_of(site)?;
        self.ensure_accepted(state)?;
        if let Some(slot) = self.current.get_mut(index) {
            *slot = state;
        }
        self.ages.reset(index);
        debug!(%site, ?state, "Site edited");
        Ok(())
    }

    /// Put every site into `state` and reset all ages.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EngineBusy`] mid-tick and
    /// [`EngineError::StateRejected`] for a state outside the alphabet.
    pub fn fill(&mut self, state: R::State) -> Result<(), EngineError> {
        self.ensure_idle()?;
        self.ensure_accepted(state)?;
        self.current.fill(state);
        self.ages.reset_all();
        debug!(?state, "Arena filled");
        Ok(())
    }

    /// Replace the whole configuration and reset all ages.
    ///
    /// Random draws use a fresh seeding generation, so reseeding twice with
    /// the same distribution gives two different configurations.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EngineBusy`] mid-tick, or the validation error
    /// of `initial`.
    pub fn reseed(&mut self, initial: InitialState<R::State>) -> Result<(), EngineError> {
        self.ensure_idle()?;
        let generation = self.generation.saturating_add(1);
        let states = draw_states(&self.rule, self.current.len(), self.stream, generation, initial)?;
        self.generation = generation;
        self.current = states;
        self.ages.reset_all();
        debug!(generation, "Arena reseeded");
        Ok(())
    }

    /// Swap in a new rule between ticks.
    ///
    /// Every current state must be valid for the new rule. Ages are kept.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EngineBusy`] mid-tick and
    /// [`EngineError::StateRejected`] if a current state is foreign to `rule`.
    pub fn reconfigure(&mut self, rule: R) -> Result<(), EngineError> {
        self.ensure_idle()?;
        if let Some(&state) = self.current.iter().find(|&&s| !rule.accepts(s)) {
            warn!(?state, "Reconfiguration rejected");
            return Err(EngineError::StateRejected {
                state: format!("{state:?}"),
            });
        }
        self.counts = NeighborCounts::new(self.current.len(), rule.label_count());
        self.rule = rule;
        info!(rule = self.rule.name(), tick = self.tick, "Rule reconfigured");
        Ok(())
    }

    /// Census of the live configuration, including edits since the last tick.
    pub fn census(&self) -> Census<R::State> {
        let rule = &self.rule;
        Census::take(
            self.tick,
            &rule.alphabet(),
            &self.current,
            self.ages.as_slice(),
            |s| rule.is_age_eligible(s),
        )
    }

    /// Censuses recorded after each tick.
    pub const fn metrics(&self) -> &MetricsCollector<R::State> {
        &self.metrics
    }

    /// All current states in arena order.
    pub fn states(&self) -> &[R::State] {
        &self.current
    }

    /// All ages in arena order.
    pub fn ages(&self) -> &[u32] {
        self.ages.as_slice()
    }

    /// Neighbor counts from the last aggregation.
    pub const fn neighbor_counts(&self) -> &NeighborCounts {
        &self.counts
    }

    /// The topology.
    pub const fn topology(&self) -> &T {
        &self.topology
    }

    /// The active rule.
    pub const fn rule(&self) -> &R {
        &self.rule
    }

    /// Number of completed ticks.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Current phase.
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// World seed.
    pub const fn seed(&self) -> u64 {
        self.stream.seed()
    }

    /// Engine options.
    pub const fn options(&self) -> EngineOptions {
        self.options
    }

    fn ensure_idle(&self) -> Result<(), EngineError> {
        if self.phase == Phase::Idle {
            Ok(())
        } else {
            warn!(phase = %self.phase, "Engine busy");
            Err(EngineError::EngineBusy { phase: self.phase })
        }
    }

    fn index_of(&self, site: T::Site) -> Result<usize, EngineError> {
        self.topology.index_of(site).ok_or_else(|| {
            warn!(%site, "Edit rejected: unknown site");
            EngineError::UnknownSite(site.to_string())
        })
    }

    fn ensure_accepted(&self, state: R::State) -> Result<(), EngineError> {
        if self.rule.accepts(state) {
            Ok(())
        } else {
            warn!(?state, "Edit rejected: state not in alphabet");
            Err(EngineError::StateRejected {
                state: format!("{state:?}"),
            })
        }
    }
}

impl<T: Topology, R: TransitionRule<State = LifeState>> Automaton<T, R> {
    /// Flip one cell between Empty and Alive. Its age resets to 0.
    ///
    /// # Errors
    ///
    /// Same as [`Automaton::set_state`].
    pub fn toggle(&mut self, site: T::Site) -> Result<LifeState, EngineError> {
        let next = self
            .state_of(site)
            .ok_or_else(|| EngineError::UnknownSite(site.to_string()))?
            .toggled();
        self.set_state(site, next)?;
        Ok(next)
    }
}

/// Compute the next state of `site` from the pre-tick snapshot.
fn evaluate_site<R: TransitionRule>(
    rule: &R,
    stream: RngStream,
    tick: u64,
    current: &[R::State],
    ages: &[u32],
    counts: &NeighborCounts,
    site: usize,
) -> Option<R::State> {
    let state = current.get(site).copied()?;
    let view = SiteView {
        state,
        counts: counts.of(site),
        age: ages.get(site).copied().unwrap_or(0),
    };
    let mut rng = stream.for_site(tick, site);
    Some(rule.next_state(&view, &mut rng))
}

/// Produce a full configuration from `initial`, validated against `rule`.
fn draw_states<R: TransitionRule>(
    rule: &R,
    sites: usize,
    stream: RngStream,
    generation: u64,
    initial: InitialState<R::State>,
) -> Result<Vec<R::State>, EngineError> {
    let reject = |state: R::State| EngineError::StateRejected {
        state: format!("{state:?}"),
    };
    match initial {
        InitialState::Explicit(states) => {
            if states.len() != sites {
                return Err(SeedingError::LengthMismatch {
                    expected: sites,
                    actual: states.len(),
                }
                .into());
            }
            if let Some(index) = states.iter().position(|&s| !rule.accepts(s)) {
                return Err(SeedingError::StateRejected { index }.into());
            }
            Ok(states)
        }
        InitialState::Fill(state) => {
            if rule.accepts(state) {
                Ok(vec![state; sites])
            } else {
                Err(reject(state))
            }
        }
        InitialState::Random(distribution) => {
            let foreign = distribution
                .weights()
                .iter()
                .map(|&(s, _)| s)
                .chain(std::iter::once(distribution.otherwise()))
                .find(|&s| !rule.accepts(s));
            if let Some(state) = foreign {
                return Err(reject(state));
            }
            Ok((0..sites)
                .map(|site| {
                    let u = stream.for_seeding(generation, site).random::<f64>();
                    distribution.sample(u)
                })
                .collect())
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use std::collections::BTreeMap;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use automata_types::{GridPos, Species};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use rand::seq::SliceRandom;

    use super::*;
    use crate::rule::{LifeParams, LifeRule, PredatorPreyRule};
    use crate::seeding::life_density;
    use crate::topology::ToroidalGrid;

    fn noisy_life() -> LifeRule {
        LifeRule::new(LifeParams {
            survive: BTreeMap::from([(1, 0.3), (2, 0.9), (3, 0.95), (4, 0.2)]),
            revive: BTreeMap::from([(0, 0.01), (3, 0.8), (6, 0.4)]),
            age_death: true,
            lambda: 20.0,
        })
        .unwrap()
    }

    fn random_engine(execution: Execution, seed: u64) -> Automaton<ToroidalGrid, LifeRule> {
        Automaton::with_options(
            ToroidalGrid::new(24, 17).unwrap(),
            noisy_life(),
            seed,
            InitialState::Random(life_density(0.35).unwrap()),
            EngineOptions {
                execution,
                metrics_retention: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn identical_seeds_identical_runs() {
        let mut a = random_engine(Execution::Sequential, 11);
        let mut b = random_engine(Execution::Sequential, 11);
        for _ in 0..25 {
            a.advance().unwrap();
            b.advance().unwrap();
            assert_eq!(a.states(), b.states());
            assert_eq!(a.ages(), b.ages());
        }
    }

    #[test]
    fn parallel_matches_sequential() {
        let mut serial = random_engine(Execution::Sequential, 5);
        let mut parallel = random_engine(Execution::Parallel, 5);
        for _ in 0..25 {
            let a = serial.advance().unwrap();
            let b = parallel.advance().unwrap();
            assert_eq!(a, b);
        }
        assert_eq!(serial.states(), parallel.states());
    }

    #[test]
    fn evaluation_order_does_not_matter() {
        let mut engine = random_engine(Execution::Sequential, 3);
        engine.advance().unwrap();
        let rule = &engine.rule;
        engine.counts.recompute(
            &engine.topology,
            &engine.current,
            |s| rule.classify(s),
            Execution::Sequential,
        );
        let sites = engine.current.len();
        let stage = |order: &[usize]| {
            let mut staged = vec![LifeState::Empty; sites];
            for &site in order {
                staged[site] = evaluate_site(
                    &engine.rule,
                    engine.stream,
                    2,
                    &engine.current,
                    engine.ages.as_slice(),
                    &engine.counts,
                    site,
                )
                .unwrap();
            }
            staged
        };
        let forward: Vec<usize> = (0..sites).collect();
        let reversed: Vec<usize> = forward.iter().rev().copied().collect();
        let mut shuffled = forward.clone();
        shuffled.shuffle(&mut SmallRng::seed_from_u64(99));

        let expected = stage(&forward);
        assert_eq!(stage(&reversed), expected);
        assert_eq!(stage(&shuffled), expected);

        engine.advance().unwrap();
        assert_eq!(engine.states(), expected.as_slice());
    }

    #[test]
    fn census_recorded_per_tick() {
        let mut engine = random_engine(Execution::Sequential, 1);
        assert_eq!(engine.metrics().len(), 1);
        engine.advance_by(4).unwrap();
        assert_eq!(engine.tick(), 4);
        let ticks: Vec<u64> = engine.metrics().series().map(|c| c.tick).collect();
        assert_eq!(ticks, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn edits_reset_age_and_validate_site() {
        let grid = ToroidalGrid::new(4, 4).unwrap();
        let rule = LifeRule::new(LifeParams::conway()).unwrap();
        let mut engine =
            Automaton::new(grid, rule, 0, InitialState::Fill(LifeState::Empty)).unwrap();
        // A 2x2 block is stable, so its cells age.
        for pos in [(1, 1), (2, 1), (1, 2), (2, 2)] {
            engine.set_state(GridPos::from(pos), LifeState::Alive).unwrap();
        }
        engine.advance_by(3).unwrap();
        assert_eq!(engine.age_of(GridPos::new(1, 1)), Some(3));

        assert_eq!(engine.toggle(GridPos::new(1, 1)).unwrap(), LifeState::Empty);
        engine.toggle(GridPos::new(1, 1)).unwrap();
        assert_eq!(engine.age_of(GridPos::new(1, 1)), Some(0));
        assert_eq!(engine.age_of(GridPos::new(2, 2)), Some(3));

        assert!(matches!(
            engine.set_state(GridPos::new(9, 0), LifeState::Alive),
            Err(EngineError::UnknownSite(_))
        ));
    }

    #[test]
    fn fill_and_reseed() {
        let mut engine = random_engine(Execution::Sequential, 8);
        engine.fill(LifeState::Empty).unwrap();
        assert!(engine.census().is_uniform(LifeState::Empty));

        engine
            .reseed(InitialState::Random(life_density(0.5).unwrap()))
            .unwrap();
        let first = engine.states().to_vec();
        engine
            .reseed(InitialState::Random(life_density(0.5).unwrap()))
            .unwrap();
        assert_ne!(engine.states(), first.as_slice());
        assert!(engine.ages().iter().all(|&a| a == 0));
    }

    #[test]
    fn explicit_initial_state_is_validated() {
        let grid = ToroidalGrid::new(3, 3).unwrap();
        let err = Automaton::new(
            grid,
            PredatorPreyRule::default(),
            0,
            InitialState::Explicit(vec![Species::Prey; 4]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            EngineError::Seeding(SeedingError::LengthMismatch {
                expected: 9,
                actual: 4
            })
        );
    }

    /// Rule that panics on the first evaluation.
    #[derive(Debug)]
    struct Exploding;

    impl TransitionRule for Exploding {
        type State = LifeState;

        fn name(&self) -> &'static str {
            "exploding"
        }

        fn alphabet(&self) -> Vec<LifeState> {
            vec![LifeState::Empty, LifeState::Alive]
        }

        fn label_count(&self) -> usize {
            1
        }

        fn classify(&self, state: LifeState) -> Option<usize> {
            state.is_alive().then_some(0)
        }

        fn next_state(&self, _site: &SiteView<'_, LifeState>, _rng: &mut impl Rng) -> LifeState {
            panic!("rule failure");
        }
    }

    #[test]
    fn panicking_tick_poisons_engine() {
        let grid = ToroidalGrid::new(2, 2).unwrap();
        let mut engine =
            Automaton::new(grid, Exploding, 0, InitialState::Fill(LifeState::Empty)).unwrap();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let _ = engine.advance();
        }));
        assert!(outcome.is_err());
        assert_eq!(engine.phase(), Phase::Evaluating);
        assert_eq!(
            engine.advance().unwrap_err(),
            EngineError::EngineBusy {
                phase: Phase::Evaluating
            }
        );
        assert!(matches!(
            engine.set_state(GridPos::new(0, 0), LifeState::Alive),
            Err(EngineError::EngineBusy { .. })
        ));
        assert_eq!(engine.tick(), 0);
    }

    #[test]
    fn reconfigure_swaps_rule_between_ticks() {
        let mut engine = random_engine(Execution::Sequential, 2);
        engine.fill(LifeState::Empty).unwrap();
        let spawning = LifeRule::new(LifeParams {
            revive: BTreeMap::from([(0, 1.0)]),
            ..LifeParams::conway()
        })
        .unwrap();
        engine.reconfigure(spawning).unwrap();
        engine.advance().unwrap();
        assert!(engine.census().is_uniform(LifeState::Alive));
    }
}
