//! Headless driver for the stochastic automata engine.
//!
//! Loads a YAML configuration, builds the configured automaton, runs it
//! until its bounds are met while logging a census every `log_every` ticks,
//! and prints the final census as JSON on stdout.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (`AUTOMATA_CONFIG`, default `automata-config.yaml`)
//! 2. Apply the `AUTOMATA_SEED` override
//! 3. Initialize structured logging (tracing)
//! 4. Build the model
//! 5. Run the tick loop
//! 6. Print the final census

mod census_logger;
mod error;

use std::io::Write as _;
use std::path::{Path, PathBuf};

use automata_core::config::{LoggingConfig, Model, RunConfig, SimulationConfig};
use automata_core::runner::{self, RunResult};
use automata_core::{Automaton, Topology, TransitionRule};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::census_logger::CensusLogger;
use crate::error::DriverError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "automata-config.yaml";

fn main() -> Result<(), DriverError> {
    let (mut config, source) = load_config()?;
    if let Some(seed) = seed_override()? {
        config.run.seed = seed;
    }

    init_logging(&config.logging);
    info!(
        source = %source,
        seed = config.run.seed,
        max_ticks = config.run.max_ticks,
        execution = ?config.run.execution,
        "Configuration loaded"
    );

    let model = config.build()?;
    match model {
        Model::Life(mut engine) => drive(&mut engine, &config.run),
        Model::PredatorPrey(mut engine) => drive(&mut engine, &config.run),
        Model::Factions(mut engine) => drive(&mut engine, &config.run),
    }
}

/// Run `engine` to completion and print its final census.
fn drive<T, R>(engine: &mut Automaton<T, R>, run: &RunConfig) -> Result<(), DriverError>
where
    T: Topology,
    R: TransitionRule,
    R::State: Serialize,
{
    let mut logger = CensusLogger::new(run.log_every);
    let result = runner::run(engine, run.bounds(), &mut logger)?;
    print_result(&result)?;
    info!(
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        "automata-engine shutdown complete"
    );
    Ok(())
}

fn print_result<S: Serialize>(result: &RunResult<S>) -> Result<(), DriverError> {
    let json = serde_json::to_string_pretty(&result.final_census)?;
    let mut stdout = std::io::stdout().lock();
    // A closed stdout (e.g. piped into `head`) is not worth failing the run.
    let _ = writeln!(stdout, "{json}");
    Ok(())
}

/// Load the configuration named by `AUTOMATA_CONFIG`.
///
/// With the variable unset, `automata-config.yaml` is used if present and
/// defaults otherwise. An explicit path that cannot be read is an error.
fn load_config() -> Result<(SimulationConfig, String), DriverError> {
    let explicit = std::env::var_os("AUTOMATA_CONFIG").map(PathBuf::from);
    load_config_from(explicit.as_deref())
}

fn load_config_from(explicit: Option<&Path>) -> Result<(SimulationConfig, String), DriverError> {
    let default = Path::new(DEFAULT_CONFIG_PATH);
    let path = match explicit {
        Some(path) => path,
        None if default.exists() => default,
        None => return Ok((SimulationConfig::default(), "defaults".to_owned())),
    };
    let config = SimulationConfig::from_file(path)?;
    Ok((config, path.display().to_string()))
}

/// Seed from `AUTOMATA_SEED`, if set.
fn seed_override() -> Result<Option<u64>, DriverError> {
    let Ok(value) = std::env::var("AUTOMATA_SEED") else {
        return Ok(None);
    };
    match value.trim().parse() {
        Ok(seed) => Ok(Some(seed)),
        Err(_) => Err(DriverError::InvalidSeed { value }),
    }
}

fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
