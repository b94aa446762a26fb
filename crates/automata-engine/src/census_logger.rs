//! Tick observer that logs a census every few ticks.

use automata_core::runner::TickObserver;
use automata_core::{Automaton, Census, Topology, TransitionRule};
use tracing::info;

/// Logs tallies and age statistics every `every` ticks.
pub struct CensusLogger {
    every: u64,
}

impl CensusLogger {
    /// Create a logger firing every `every` ticks (0 disables it).
    pub const fn new(every: u64) -> Self {
        Self { every }
    }

    const fn due(&self, tick: u64) -> bool {
        matches!(tick.checked_rem(self.every), Some(0))
    }
}

impl<T: Topology, R: TransitionRule> TickObserver<T, R> for CensusLogger {
    fn on_tick(&mut self, census: &Census<R::State>, engine: &Automaton<T, R>) {
        if !self.due(census.tick) {
            return;
        }
        let tallies: Vec<String> = census
            .tallies
            .iter()
            .map(|t| format!("{:?}={}", t.state, t.count))
            .collect();
        info!(
            rule = engine.rule().name(),
            tick = census.tick,
            tallies = tallies.join(" "),
            mean_age = census.mean_age,
            max_age = census.max_age,
            "Census"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_on_multiples_only() {
        let logger = CensusLogger::new(10);
        assert!(logger.due(10));
        assert!(logger.due(30));
        assert!(!logger.due(15));
        assert!(!CensusLogger::new(0).due(10));
    }
}
