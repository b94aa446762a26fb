//! Synchronous stochastic cellular automata.
//!
//! Every site of a fixed neighbor structure moves to its next state at the
//! same instant, computed only from the previous instant's states, neighbor
//! counts and per-site ages. Probabilistic rules draw from random streams
//! keyed by `(seed, tick, site)`, so a run is reproducible and does not
//! depend on evaluation order or thread count.
//!
//! # Modules
//!
//! - [`topology`] -- Toroidal grids with the Moore neighborhood and
//!   arbitrary undirected graphs.
//! - [`aggregate`] -- Per-tick neighbor counts for every classification label.
//! - [`age`] -- Consecutive-tick persistence counters.
//! - [`rng`] -- Keyed per-site random streams.
//! - [`rule`] -- The [`TransitionRule`](rule::TransitionRule) trait and the
//!   Life, predator/prey and faction-control families.
//! - [`seeding`] -- Explicit, uniform and random initial configurations.
//! - [`engine`] -- The double-buffered [`Automaton`](engine::Automaton) and
//!   its tick phases.
//! - [`metrics`] -- Per-tick censuses and their rolling series.
//! - [`runner`] -- Bounded run loop with per-tick observers.
//! - [`config`] -- YAML configuration that builds a ready engine.

pub mod age;
pub mod aggregate;
pub mod config;
pub mod engine;
pub mod metrics;
pub mod rng;
pub mod rule;
pub mod runner;
pub mod seeding;
pub mod topology;

pub use engine::{Automaton, EngineError, EngineOptions, Execution, Phase};
pub use metrics::{Census, MetricsCollector, StateTally};
pub use rule::{RuleConfigError, SiteView, TransitionRule};
pub use seeding::{Distribution, InitialState, SeedingError};
pub use topology::{AdjacencyGraph, Topology, TopologyError, ToroidalGrid};
