//! Configuration loading and typed config structures.
//!
//! A run is described by one YAML document (by default
//! `automata-config.yaml`). This module defines strongly-typed structs that
//! mirror it and turns the `model` section into a ready engine.
//!
//! ```yaml
//! run:
//!   seed: 7
//!   max_ticks: 500
//!   execution: parallel
//! model:
//!   life:
//!     width: 64
//!     height: 48
//!     alive_fraction: 0.3
//!     rule:
//!       survive: {2: 1.0, 3: 1.0}
//!       revive: {0: 0.001, 3: 1.0}
//!       age_death: true
//!       lambda: 80.0
//! ```

use std::num::NonZeroUsize;
use std::path::Path;

use automata_types::{Allegiance, VertexId};
use serde::Deserialize;
use tracing::info;

use crate::engine::{Automaton, EngineError, EngineOptions, Execution};
use crate::rule::{
    FactionParams, FactionRule, LifeParams, LifeRule, PredatorPreyParams, PredatorPreyRule,
};
use crate::runner::RunBounds;
use crate::seeding::{self, InitialState};
use crate::topology::{AdjacencyGraph, ToroidalGrid};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level run configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Seed, bounds and scheduling.
    #[serde(default)]
    pub run: RunConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Which automaton to build and how. Written as a single-key map
    /// (`life:`, `predator_prey:` or `factions:`).
    #[serde(default, with = "serde_yml::with::singleton_map")]
    pub model: ModelConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_yml::from_str(&contents)?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// Build the configured engine.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the model section is invalid.
    pub fn build(&self) -> Result<Model, EngineError> {
        self.model.build(self.run.seed, self.run.engine_options())
    }
}

/// Seed, bounds and scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    /// World seed for every random draw.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Stop after this many ticks (0 = unlimited).
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    /// Log a census every N ticks (0 = never).
    #[serde(default = "default_log_every")]
    pub log_every: u64,

    /// Stop early once every site is in the quiescent state.
    #[serde(default)]
    pub stop_on_quiescence: bool,

    /// Sequential or parallel per-site work.
    #[serde(default)]
    pub execution: Execution,

    /// How many per-tick censuses the engine keeps.
    #[serde(default = "default_metrics_retention")]
    pub metrics_retention: Option<NonZeroUsize>,
}

const fn default_seed() -> u64 {
    42
}

const fn default_max_ticks() -> u64 {
    1000
}

const fn default_log_every() -> u64 {
    100
}

const fn default_metrics_retention() -> Option<NonZeroUsize> {
    NonZeroUsize::new(1000)
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            max_ticks: default_max_ticks(),
            log_every: default_log_every(),
            stop_on_quiescence: false,
            execution: Execution::default(),
            metrics_retention: default_metrics_retention(),
        }
    }
}

impl RunConfig {
    /// Termination conditions for [`crate::runner::run`].
    pub const fn bounds(&self) -> RunBounds {
        RunBounds {
            max_ticks: self.max_ticks,
            stop_on_quiescence: self.stop_on_quiescence,
        }
    }

    /// Engine options derived from this section.
    pub const fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            execution: self.execution,
            metrics_retention: self.metrics_retention,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error), used when `RUST_LOG` is
    /// not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_owned()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Which automaton to run. Exactly one key selects the variant.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelConfig {
    /// Stochastic Life on a torus.
    Life(LifeModelConfig),
    /// Predator/prey on a torus.
    PredatorPrey(PredatorPreyModelConfig),
    /// Faction control on a graph.
    Factions(FactionModelConfig),
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::Life(LifeModelConfig::default())
    }
}

impl ModelConfig {
    /// Build the engine this section describes.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] for invalid dimensions, graph structure, rule
    /// parameters or initial distribution.
    pub fn build(&self, seed: u64, options: EngineOptions) -> Result<Model, EngineError> {
        let model = match self {
            Self::Life(cfg) => {
                let grid = ToroidalGrid::new(cfg.width, cfg.height)?;
                let rule = LifeRule::new(cfg.rule.clone())?;
                let initial = InitialState::Random(seeding::life_density(cfg.alive_fraction)?);
                Model::Life(Automaton::with_options(grid, rule, seed, initial, options)?)
            }
            Self::PredatorPrey(cfg) => {
                let grid = ToroidalGrid::new(cfg.width, cfg.height)?;
                let rule = PredatorPreyRule::new(cfg.rule.clone())?;
                let initial = InitialState::Random(seeding::predator_prey_density(
                    cfg.prey_density,
                    cfg.predator_density,
                )?);
                Model::PredatorPrey(Automaton::with_options(grid, rule, seed, initial, options)?)
            }
            Self::Factions(cfg) => {
                let graph = AdjacencyGraph::new(cfg.vertices.iter().copied(), cfg.edge_list())?;
                let rule = FactionRule::new(cfg.rule.clone())?;
                let initial = match &cfg.initial {
                    Some(states) => InitialState::Explicit(states.clone()),
                    None => InitialState::Random(seeding::faction_split(
                        rule.faction_count(),
                        cfg.barbarian_fraction,
                    )?),
                };
                Model::Factions(Automaton::with_options(graph, rule, seed, initial, options)?)
            }
        };
        info!(model = model.name(), seed, "Model built from configuration");
        Ok(model)
    }
}

/// Stochastic Life on a `width` x `height` torus.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LifeModelConfig {
    /// Grid width.
    #[serde(default = "default_width")]
    pub width: u32,
    /// Grid height.
    #[serde(default = "default_height")]
    pub height: u32,
    /// Probability tables and aging.
    #[serde(default)]
    pub rule: LifeParams,
    /// Share of cells alive at start.
    #[serde(default = "default_alive_fraction")]
    pub alive_fraction: f64,
}

const fn default_width() -> u32 {
    100
}

const fn default_height() -> u32 {
    100
}

const fn default_alive_fraction() -> f64 {
    0.2
}

impl Default for LifeModelConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            rule: LifeParams::default(),
            alive_fraction: default_alive_fraction(),
        }
    }
}

/// Predator/prey on a `width` x `height` torus.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PredatorPreyModelConfig {
    /// Grid width.
    #[serde(default = "default_width")]
    pub width: u32,
    /// Grid height.
    #[serde(default = "default_height")]
    pub height: u32,
    /// Survive/birth sets for prey.
    #[serde(default)]
    pub rule: PredatorPreyParams,
    /// Share of non-predator cells starting as prey.
    #[serde(default = "default_prey_density")]
    pub prey_density: f64,
    /// Share of cells starting as predators.
    #[serde(default = "default_predator_density")]
    pub predator_density: f64,
}

const fn default_prey_density() -> f64 {
    0.05
}

const fn default_predator_density() -> f64 {
    0.1
}

impl Default for PredatorPreyModelConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            rule: PredatorPreyParams::default(),
            prey_density: default_prey_density(),
            predator_density: default_predator_density(),
        }
    }
}

/// Faction control on an explicit graph.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FactionModelConfig {
    /// Factions and rates.
    #[serde(default)]
    pub rule: FactionParams,
    /// Vertex ids, in arena order.
    #[serde(default = "default_vertices")]
    pub vertices: Vec<VertexId>,
    /// Undirected edges. When omitted the vertices form a ring.
    #[serde(default)]
    pub edges: Option<Vec<(VertexId, VertexId)>>,
    /// Explicit starting allegiance per vertex, in `vertices` order, e.g.
    /// `[{faction: 0}, barbarian]`.
    #[serde(default, with = "serde_yml::with::singleton_map_recursive")]
    pub initial: Option<Vec<Allegiance>>,
    /// Share of vertices starting barbarian when `initial` is omitted.
    #[serde(default = "default_barbarian_fraction")]
    pub barbarian_fraction: f64,
}

fn default_vertices() -> Vec<VertexId> {
    (0..12).map(VertexId).collect()
}

const fn default_barbarian_fraction() -> f64 {
    0.1
}

impl Default for FactionModelConfig {
    fn default() -> Self {
        Self {
            rule: FactionParams::default(),
            vertices: default_vertices(),
            edges: None,
            initial: None,
            barbarian_fraction: default_barbarian_fraction(),
        }
    }
}

impl FactionModelConfig {
    /// Configured edges, or a ring through `vertices` if none are given.
    pub fn edge_list(&self) -> Vec<(VertexId, VertexId)> {
        if let Some(edges) = &self.edges {
            return edges.clone();
        }
        if self.vertices.len() < 3 {
            return self.vertices.windows(2).filter_map(pair).collect();
        }
        self.vertices
            .iter()
            .copied()
            .zip(self.vertices.iter().copied().cycle().skip(1))
            .collect()
    }
}

fn pair(window: &[VertexId]) -> Option<(VertexId, VertexId)> {
    match window {
        [a, b] => Some((*a, *b)),
        _ => None,
    }
}

/// A built engine of any configured family.
#[derive(Debug)]
pub enum Model {
    /// Stochastic Life engine.
    Life(Automaton<ToroidalGrid, LifeRule>),
    /// Predator/prey engine.
    PredatorPrey(Automaton<ToroidalGrid, PredatorPreyRule>),
    /// Faction-control engine.
    Factions(Automaton<AdjacencyGraph, FactionRule>),
}

impl Model {
    /// Name of the rule family.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Life(_) => "life",
            Self::PredatorPrey(_) => "predator_prey",
            Self::Factions(_) => "factions",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        assert_eq!(config.run.seed, 42);
        assert_eq!(config.run.max_ticks, 1000);
        assert_eq!(config.logging.level, "info");
        assert!(matches!(config.model, ModelConfig::Life(_)));
        assert!(matches!(config.build().unwrap(), Model::Life(_)));
    }

    #[test]
    fn parse_life_yaml() {
        let yaml = r"
run:
  seed: 9
  max_ticks: 50
  execution: parallel
model:
  life:
    width: 16
    height: 8
    alive_fraction: 0.5
    rule:
      revive: {0: 0.001, 3: 1.0}
      age_death: true
      lambda: 80.0
";
        let config = SimulationConfig::parse(yaml).unwrap();
        assert_eq!(config.run.seed, 9);
        assert_eq!(config.run.execution, Execution::Parallel);
        assert_eq!(config.run.log_every, 100);
        let ModelConfig::Life(life) = &config.model else {
            panic!("expected life model");
        };
        assert_eq!((life.width, life.height), (16, 8));
        assert!(life.rule.age_death);
        assert_eq!(life.rule.revive.get(&0).copied(), Some(0.001));
        assert_eq!(life.rule.survive, LifeParams::conway().survive);

        let Model::Life(engine) = config.build().unwrap() else {
            panic!("expected life engine");
        };
        assert_eq!(engine.states().len(), 128);
        assert_eq!(engine.seed(), 9);
    }

    #[test]
    fn parse_factions_with_explicit_graph() {
        let yaml = r"
model:
  factions:
    rule:
      factions: [Red, Blue]
      chaos_rate: 0.0
    vertices: [10, 20, 30]
    edges: [[10, 20], [20, 30]]
    initial: [{faction: 0}, barbarian, {faction: 1}]
";
        let config = SimulationConfig::parse(yaml).unwrap();
        let Model::Factions(engine) = config.build().unwrap() else {
            panic!("expected faction engine");
        };
        assert_eq!(engine.topology().edge_count(), 2);
        assert_eq!(engine.state_of(VertexId(20)), Some(Allegiance::Barbarian));
        assert_eq!(engine.state_of(VertexId(30)), Some(Allegiance::Faction(1)));
    }

    #[test]
    fn faction_ring_by_default() {
        let cfg = FactionModelConfig::default();
        let edges = cfg.edge_list();
        assert_eq!(edges.len(), 12);
        assert_eq!(edges.last().copied(), Some((VertexId(11), VertexId(0))));
    }

    #[test]
    fn invalid_model_fails_to_build() {
        let yaml = r"
model:
  predator_prey:
    width: 0
";
        let config = SimulationConfig::parse(yaml).unwrap();
        assert!(matches!(config.build(), Err(EngineError::Topology(_))));

        let yaml = r"
model:
  life:
    rule:
      survive: {2: 1.5}
";
        let config = SimulationConfig::parse(yaml).unwrap();
        assert!(matches!(config.build(), Err(EngineError::Rule(_))));
    }

    #[test]
    fn shipped_config_builds() {
        let config =
            SimulationConfig::parse(include_str!("../../../automata-config.yaml")).unwrap();
        assert!(config.run.stop_on_quiescence);
        assert_eq!(config.run.execution, Execution::Parallel);
        let Model::Life(engine) = config.build().unwrap() else {
            panic!("expected life engine");
        };
        assert_eq!(engine.states().len(), 10_000);
        assert!(engine.rule().params().age_death);
    }

    #[test]
    fn initial_allegiances_accept_map_and_scalar_forms() {
        let yaml = r"
model:
  factions:
    vertices: [1, 2, 3, 4]
    initial:
      - faction: 2
      - barbarian
      - {faction: 0}
      - barbarian
";
        let config = SimulationConfig::parse(yaml).unwrap();
        let ModelConfig::Factions(factions) = &config.model else {
            panic!("expected faction model");
        };
        assert_eq!(
            factions.initial.as_deref(),
            Some(
                &[
                    Allegiance::Faction(2),
                    Allegiance::Barbarian,
                    Allegiance::Faction(0),
                    Allegiance::Barbarian,
                ][..]
            )
        );
        assert_eq!(factions.edge_list().len(), 4);
    }

    #[test]
    fn unknown_model_is_a_yaml_error() {
        let result = SimulationConfig::parse("model:\n  langton: {}\n");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }
}
