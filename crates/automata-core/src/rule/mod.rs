//! Transition rules.
//!
//! A [`TransitionRule`] is a pure function from one site's pre-tick view
//! (its state, its neighbor counts, its age) plus a keyed random generator to
//! the site's next state. Rules never see other sites directly and never see
//! a value produced during the tick being evaluated.
//!
//! # Rule families
//!
//! - [`life`] -- binary Life with probability tables and age-based mortality.
//! - [`predator_prey`] -- prey follow Life-like sets, predators convert prey
//!   and starve without them.
//! - [`faction`] -- faction control over a graph with one shared draw per
//!   vertex and a shuffled tie-break order.

pub mod faction;
pub mod life;
pub mod predator_prey;

use rand::Rng;

pub use faction::{FactionParams, FactionRule};
pub use life::{LifeParams, LifeRule, exponential_cdf};
pub use predator_prey::{PredatorPreyParams, PredatorPreyRule};

/// Errors raised while validating a rule configuration bundle.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleConfigError {
    /// A probability table entry is outside `[0, 1]` (or not a number).
    #[error("{table}[{key}] = {value} is not a probability in [0, 1]")]
    ProbabilityOutOfRange {
        /// Which table held the value.
        table: &'static str,
        /// The neighbor count the entry is keyed by.
        key: u32,
        /// The offending value.
        value: f64,
    },

    /// A rate is negative or not finite.
    #[error("{rate} = {value} must be a finite, non-negative percentage")]
    InvalidRate {
        /// Name of the rate.
        rate: &'static str,
        /// The offending value.
        value: f64,
    },

    /// The age-decay scale must be finite and strictly positive.
    #[error("age scale lambda = {0} must be finite and > 0")]
    InvalidScale(f64),

    /// A faction rule needs at least one faction.
    #[error("at least one faction must be configured")]
    NoFactions,

    /// Faction indices are stored in a byte.
    #[error("{0} factions configured, at most 255 are supported")]
    TooManyFactions(usize),
}

/// What a rule sees of one site during evaluation.
#[derive(Debug, Clone, Copy)]
pub struct SiteView<'a, S> {
    /// The site's pre-tick state.
    pub state: S,
    /// Neighbor counts per label, from the pre-tick snapshot.
    pub counts: &'a [u32],
    /// The site's age as of the end of the previous tick.
    pub age: u32,
}

impl<S> SiteView<'_, S> {
    /// Neighbor count for `label` (zero if the label is unknown).
    pub fn count(&self, label: usize) -> u32 {
        self.counts.get(label).copied().unwrap_or(0)
    }
}

/// A synchronous, possibly probabilistic, per-site transition function.
pub trait TransitionRule: Send + Sync {
    /// The state alphabet.
    type State: Copy + Eq + Ord + core::fmt::Debug + Send + Sync;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Every state the rule can produce, in census order.
    fn alphabet(&self) -> Vec<Self::State>;

    /// Number of neighbor classification labels.
    fn label_count(&self) -> usize;

    /// Label of `state`, or `None` if neighbors in this state are not counted.
    fn classify(&self, state: Self::State) -> Option<usize>;

    /// Compute the next state of one site.
    ///
    /// `rng` is keyed to this site and tick; implementations must draw from
    /// it in a fixed order so results stay reproducible.
    fn next_state(&self, site: &SiteView<'_, Self::State>, rng: &mut impl Rng) -> Self::State;

    /// Whether `state` accumulates age.
    fn is_age_eligible(&self, _state: Self::State) -> bool {
        false
    }

    /// Whether `state` belongs to the alphabet of this configuration.
    fn accepts(&self, state: Self::State) -> bool {
        self.alphabet().contains(&state)
    }

    /// The state whose total occupation means the run has died out, if any.
    fn quiescent(&self) -> Option<Self::State> {
        None
    }
}

/// Reject a probability outside `[0, 1]`.
pub(crate) fn check_probability(
    table: &'static str,
    key: u32,
    value: f64,
) -> Result<(), RuleConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(RuleConfigError::ProbabilityOutOfRange { table, key, value })
    }
}

/// Reject a negative or non-finite percentage rate.
pub(crate) fn check_rate(rate: &'static str, value: f64) -> Result<(), RuleConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(RuleConfigError::InvalidRate { rate, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probability_bounds() {
        assert!(check_probability("survive", 2, 0.0).is_ok());
        assert!(check_probability("survive", 2, 1.0).is_ok());
        assert!(check_probability("survive", 2, 1.5).is_err());
        assert!(check_probability("survive", 2, -0.1).is_err());
        assert!(check_probability("survive", 2, f64::NAN).is_err());
    }

    #[test]
    fn rate_bounds() {
        assert!(check_rate("chaos_rate", 0.0).is_ok());
        assert!(check_rate("chaos_rate", 250.0).is_ok());
        assert!(check_rate("chaos_rate", -1.0).is_err());
        assert!(check_rate("chaos_rate", f64::INFINITY).is_err());
    }

    #[test]
    fn site_view_unknown_label_reads_zero() {
        let view = SiteView {
            state: (),
            counts: &[3],
            age: 0,
        };
        assert_eq!(view.count(0), 3);
        assert_eq!(view.count(4), 0);
    }
}
