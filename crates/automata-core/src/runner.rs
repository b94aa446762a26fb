//! Bounded run loop.
//!
//! [`run`] drives an [`Automaton`] tick by tick until a termination condition
//! holds:
//!
//! - **Bounded run**: stop after `max_ticks` ticks (0 means unbounded).
//! - **Quiescence**: optionally stop as soon as every site sits in the rule's
//!   quiescent state (for Life and predator/prey, all Empty).
//!
//! A [`TickObserver`] is called after every committed tick; renderers, loggers
//! and recorders plug in there.

use tracing::{info, warn};

use crate::engine::{Automaton, EngineError};
use crate::metrics::Census;
use crate::rule::TransitionRule;
use crate::topology::Topology;

/// Errors that can occur during a run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A tick failed.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying engine error.
        #[from]
        source: EngineError,
    },

    /// Neither a tick limit nor a quiescence stop was configured, so the run
    /// could never end.
    #[error("run has no termination condition")]
    Unbounded,
}

/// When a run stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunBounds {
    /// Maximum ticks to run (0 = unlimited).
    pub max_ticks: u64,
    /// Stop once every site is in the rule's quiescent state.
    pub stop_on_quiescence: bool,
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEndReason {
    /// The tick limit was reached.
    MaxTicksReached,
    /// Every site reached the quiescent state.
    Quiescent,
}

/// Outcome of a run.
#[derive(Debug)]
pub struct RunResult<S> {
    /// The reason the run ended.
    pub end_reason: RunEndReason,
    /// Ticks executed by this run.
    pub total_ticks: u64,
    /// Census after the last tick (the starting census if none ran).
    pub final_census: Census<S>,
}

/// Callback invoked after each tick commits.
pub trait TickObserver<T: Topology, R: TransitionRule> {
    /// Called with the tick's census and the engine, which is idle again.
    fn on_tick(&mut self, census: &Census<R::State>, engine: &Automaton<T, R>);
}

/// An observer that does nothing.
pub struct NoOpObserver;

impl<T: Topology, R: TransitionRule> TickObserver<T, R> for NoOpObserver {
    fn on_tick(&mut self, _census: &Census<R::State>, _engine: &Automaton<T, R>) {}
}

/// Advance `engine` until one of `bounds` is met.
///
/// A quiescent starting configuration ends the run before any tick when
/// `stop_on_quiescence` is set.
///
/// # Errors
///
/// Returns [`RunnerError::Unbounded`] if `bounds` can never end the run, or
/// the first engine error.
pub fn run<T, R>(
    engine: &mut Automaton<T, R>,
    bounds: RunBounds,
    observer: &mut dyn TickObserver<T, R>,
) -> Result<RunResult<R::State>, RunnerError>
where
    T: Topology,
    R: TransitionRule,
{
    let quiescent = if bounds.stop_on_quiescence {
        engine.rule().quiescent()
    } else {
        None
    };
    if bounds.max_ticks == 0 && quiescent.is_none() {
        return Err(RunnerError::Unbounded);
    }

    info!(
        rule = engine.rule().name(),
        start_tick = engine.tick(),
        max_ticks = bounds.max_ticks,
        stop_on_quiescence = quiescent.is_some(),
        "Run starting"
    );

    let mut census = engine.census();
    let mut total_ticks: u64 = 0;
    let end_reason = loop {
        if quiescent.is_some_and(|q| census.is_uniform(q)) {
            info!(tick = census.tick, "Population died out");
            break RunEndReason::Quiescent;
        }
        if bounds.max_ticks > 0 && total_ticks >= bounds.max_ticks {
            break RunEndReason::MaxTicksReached;
        }
        census = engine.advance()?;
        total_ticks = total_ticks.saturating_add(1);
        observer.on_tick(&census, engine);
    };

    let result = RunResult {
        end_reason,
        total_ticks,
        final_census: census,
    };
    log_run_end(&result);
    Ok(result)
}

fn log_run_end<S>(result: &RunResult<S>) {
    if result.total_ticks == 0 {
        warn!(reason = ?result.end_reason, "Run ended with no ticks executed");
    } else {
        info!(
            reason = ?result.end_reason,
            total_ticks = result.total_ticks,
            final_tick = result.final_census.tick,
            mean_age = result.final_census.mean_age,
            "Run ended"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use automata_types::{GridPos, LifeState, Species};

    use super::*;
    use crate::rule::{LifeParams, LifeRule, PredatorPreyRule};
    use crate::seeding::InitialState;
    use crate::topology::ToroidalGrid;

    struct TickRecorder {
        ticks: Vec<u64>,
    }

    impl<T: Topology, R: TransitionRule> TickObserver<T, R> for TickRecorder {
        fn on_tick(&mut self, census: &Census<R::State>, engine: &Automaton<T, R>) {
            assert_eq!(census.tick, engine.tick());
            self.ticks.push(census.tick);
        }
    }

    fn blinker() -> Automaton<ToroidalGrid, LifeRule> {
        let grid = ToroidalGrid::new(5, 5).unwrap();
        let rule = LifeRule::new(LifeParams::conway()).unwrap();
        let mut engine = Automaton::new(grid, rule, 0, InitialState::Fill(LifeState::Empty)).unwrap();
        for x in 1..=3 {
            engine.set_state(GridPos::new(x, 2), LifeState::Alive).unwrap();
        }
        engine
    }

    #[test]
    fn stops_at_max_ticks() {
        let mut engine = blinker();
        let mut recorder = TickRecorder { ticks: Vec::new() };
        let bounds = RunBounds {
            max_ticks: 6,
            stop_on_quiescence: true,
        };
        let result = run(&mut engine, bounds, &mut recorder).unwrap();
        assert_eq!(result.end_reason, RunEndReason::MaxTicksReached);
        assert_eq!(result.total_ticks, 6);
        assert_eq!(recorder.ticks, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(result.final_census.count(LifeState::Alive), 3);
    }

    #[test]
    fn stops_when_population_dies_out() {
        let grid = ToroidalGrid::new(6, 6).unwrap();
        let mut engine = Automaton::new(
            grid,
            PredatorPreyRule::default(),
            0,
            InitialState::Fill(Species::Empty),
        )
        .unwrap();
        engine
            .set_state(GridPos::new(2, 2), Species::Predator)
            .unwrap();
        let bounds = RunBounds {
            max_ticks: 100,
            stop_on_quiescence: true,
        };
        let result = run(&mut engine, bounds, &mut NoOpObserver).unwrap();
        assert_eq!(result.end_reason, RunEndReason::Quiescent);
        assert_eq!(result.total_ticks, 1);
    }

    #[test]
    fn unbounded_run_is_rejected() {
        let mut engine = blinker();
        let result = run(&mut engine, RunBounds::default(), &mut NoOpObserver);
        assert!(matches!(result, Err(RunnerError::Unbounded)));
        assert_eq!(engine.tick(), 0);
    }
}
