//! Initial configurations.
//!
//! An engine starts from an explicit per-site assignment, a uniform fill, or
//! a random draw from a categorical [`Distribution`]. Random draws use the
//! engine's keyed seeding stream, so the same seed always yields the same
//! starting configuration.

use automata_types::{Allegiance, LifeState, Species};

/// Errors raised while validating an initial configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeedingError {
    /// An explicit assignment does not cover every site exactly once.
    #[error("initial assignment has {actual} states for {expected} sites")]
    LengthMismatch {
        /// Number of sites in the topology.
        expected: usize,
        /// Number of states supplied.
        actual: usize,
    },

    /// A distribution weight is negative or not finite.
    #[error("distribution weight {value} must be finite and non-negative")]
    InvalidWeight {
        /// The offending weight.
        value: f64,
    },

    /// Distribution weights add up to more than one.
    #[error("distribution weights sum to {total}, which exceeds 1")]
    WeightsExceedOne {
        /// Sum of the weights.
        total: f64,
    },

    /// An explicit assignment contains a state outside the rule's alphabet.
    #[error("initial state at site {index} is not valid for this rule")]
    StateRejected {
        /// Arena index of the offending site.
        index: usize,
    },
}

/// Categorical distribution over states.
///
/// Each listed state is drawn with its weight; the remaining mass goes to
/// `otherwise`.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution<S> {
    weights: Vec<(S, f64)>,
    otherwise: S,
}

impl<S: Copy> Distribution<S> {
    /// Build a distribution from weighted states plus a fallback.
    ///
    /// # Errors
    ///
    /// Returns [`SeedingError`] if a weight is negative or not finite, or if
    /// the weights add up to more than one.
    pub fn new(weights: Vec<(S, f64)>, otherwise: S) -> Result<Self, SeedingError> {
        let mut total = 0.0;
        for &(_, value) in &weights {
            if !(value.is_finite() && value >= 0.0) {
                return Err(SeedingError::InvalidWeight { value });
            }
            total += value;
        }
        // Allow float noise from weights computed as products.
        if total > 1.0 + 1e-9 {
            return Err(SeedingError::WeightsExceedOne { total });
        }
        Ok(Self { weights, otherwise })
    }

    /// `state` with probability `density`, `otherwise` elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`SeedingError`] if `density` is not in `[0, 1]`.
    pub fn density(state: S, density: f64, otherwise: S) -> Result<Self, SeedingError> {
        Self::new(vec![(state, density)], otherwise)
    }

    /// Map a uniform draw in `[0, 1)` to a state.
    pub fn sample(&self, u: f64) -> S {
        let mut acc = 0.0;
        for &(state, weight) in &self.weights {
            acc += weight;
            if u < acc {
                return state;
            }
        }
        self.otherwise
    }

    /// The weighted states.
    pub fn weights(&self) -> &[(S, f64)] {
        &self.weights
    }

    /// The state receiving the remaining mass.
    pub const fn otherwise(&self) -> S {
        self.otherwise
    }
}

/// Alive with probability `alive_fraction`.
///
/// # Errors
///
/// Returns [`SeedingError`] if the fraction is not in `[0, 1]`.
pub fn life_density(alive_fraction: f64) -> Result<Distribution<LifeState>, SeedingError> {
    Distribution::density(LifeState::Alive, alive_fraction, LifeState::Empty)
}

/// Predators with probability `predator_density`; of the remaining cells,
/// a `prey_density` share start as prey.
///
/// # Errors
///
/// Returns [`SeedingError`] if either density is not in `[0, 1]`.
pub fn predator_prey_density(
    prey_density: f64,
    predator_density: f64,
) -> Result<Distribution<Species>, SeedingError> {
    for value in [prey_density, predator_density] {
        if !(0.0..=1.0).contains(&value) {
            return Err(SeedingError::InvalidWeight { value });
        }
    }
    Distribution::new(
        vec![
            (Species::Predator, predator_density),
            (Species::Prey, prey_density * (1.0 - predator_density)),
        ],
        Species::Empty,
    )
}

/// Barbarian with probability `barbarian_fraction`; otherwise one of the
/// `factions` factions, uniformly.
///
/// # Errors
///
/// Returns [`SeedingError`] if the fraction is not in `[0, 1]`.
pub fn faction_split(
    factions: u8,
    barbarian_fraction: f64,
) -> Result<Distribution<Allegiance>, SeedingError> {
    if !(0.0..=1.0).contains(&barbarian_fraction) {
        return Err(SeedingError::InvalidWeight {
            value: barbarian_fraction,
        });
    }
    if factions == 0 {
        return Distribution::new(Vec::new(), Allegiance::Barbarian);
    }
    let share = (1.0 - barbarian_fraction) / f64::from(factions);
    let weights = (0..factions)
        .map(|i| (Allegiance::Faction(i), share))
        .collect();
    Distribution::new(weights, Allegiance::Barbarian)
}

/// How an engine's sites are first populated.
#[derive(Debug, Clone, PartialEq)]
pub enum InitialState<S> {
    /// One state per site, in arena order.
    Explicit(Vec<S>),
    /// Every site in the same state.
    Fill(S),
    /// Every site drawn independently from a distribution.
    Random(Distribution<S>),
}
