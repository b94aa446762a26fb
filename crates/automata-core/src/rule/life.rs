//! Stochastic Life with optional age-based mortality.
//!
//! Survival and revival are looked up in probability tables keyed by the
//! number of live neighbors; a missing key means probability zero. With
//! `age_death` enabled, a live cell that passed the survival draw still dies
//! with probability `1 - exp(-age / lambda)`.

use std::collections::BTreeMap;

use automata_types::LifeState;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{RuleConfigError, SiteView, TransitionRule, check_probability};

/// Label under which live neighbors are counted.
pub const ALIVE: usize = 0;

/// Configuration for [`LifeRule`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifeParams {
    /// Survival probability of a live cell, by live-neighbor count.
    #[serde(default = "default_survive")]
    pub survive: BTreeMap<u32, f64>,
    /// Birth probability of an empty cell, by live-neighbor count.
    #[serde(default = "default_revive")]
    pub revive: BTreeMap<u32, f64>,
    /// Whether live cells face age-based mortality.
    #[serde(default)]
    pub age_death: bool,
    /// Scale of the exponential age-mortality curve, in ticks.
    #[serde(default = "default_lambda")]
    pub lambda: f64,
}

fn default_survive() -> BTreeMap<u32, f64> {
    BTreeMap::from([(2, 1.0), (3, 1.0)])
}

fn default_revive() -> BTreeMap<u32, f64> {
    BTreeMap::from([(3, 1.0)])
}

const fn default_lambda() -> f64 {
    1000.0
}

impl Default for LifeParams {
    fn default() -> Self {
        Self::conway()
    }
}

impl LifeParams {
    /// Classic B3/S23 with certainty and no aging.
    pub fn conway() -> Self {
        Self {
            survive: default_survive(),
            revive: default_revive(),
            age_death: false,
            lambda: default_lambda(),
        }
    }

    /// Check every probability and the age scale.
    ///
    /// # Errors
    ///
    /// Returns [`RuleConfigError`] naming the first invalid entry.
    pub fn validate(&self) -> Result<(), RuleConfigError> {
        for (&key, &value) in &self.survive {
            check_probability("survive", key, value)?;
        }
        for (&key, &value) in &self.revive {
            check_probability("revive", key, value)?;
        }
        if !(self.lambda.is_finite() && self.lambda > 0.0) {
            return Err(RuleConfigError::InvalidScale(self.lambda));
        }
        Ok(())
    }
}

/// Cumulative distribution of an exponential with the given scale.
pub fn exponential_cdf(x: f64, scale: f64) -> f64 {
    1.0 - (-x / scale).exp()
}

/// Life rule over [`LifeState`].
#[derive(Debug, Clone)]
pub struct LifeRule {
    params: LifeParams,
}

impl LifeRule {
    /// Build a rule from validated parameters.
    ///
    /// # Errors
    ///
    /// Returns [`RuleConfigError`] if a table entry is not a probability or
    /// `lambda` is not positive.
    pub fn new(params: LifeParams) -> Result<Self, RuleConfigError> {
        params.validate()?;
        Ok(Self { params })
    }

    /// The active parameters.
    pub const fn params(&self) -> &LifeParams {
        &self.params
    }

    fn survive_probability(&self, live: u32) -> f64 {
        self.params.survive.get(&live).copied().unwrap_or(0.0)
    }

    fn revive_probability(&self, live: u32) -> f64 {
        self.params.revive.get(&live).copied().unwrap_or(0.0)
    }
}

impl TransitionRule for LifeRule {
    type State = LifeState;

    fn name(&self) -> &'static str {
        "life"
    }

    fn alphabet(&self) -> Vec<LifeState> {
        vec![LifeState::Empty, LifeState::Alive]
    }

    fn label_count(&self) -> usize {
        1
    }

    fn classify(&self, state: LifeState) -> Option<usize> {
        state.is_alive().then_some(ALIVE)
    }

    fn next_state(&self, site: &SiteView<'_, LifeState>, rng: &mut impl Rng) -> LifeState {
        let live = site.count(ALIVE);
        match site.state {
            LifeState::Alive => {
                let survives = rng.random::<f64>() < self.survive_probability(live);
                // The age draw is taken whenever aging is on so the stream
                // position does not depend on the survival outcome.
                let worn_out = self.params.age_death
                    && rng.random::<f64>()
                        < exponential_cdf(f64::from(site.age), self.params.lambda);
                LifeState::from(survives && !worn_out)
            }
            LifeState::Empty => {
                LifeState::from(rng.random::<f64>() < self.revive_probability(live))
            }
        }
    }

    fn is_age_eligible(&self, state: LifeState) -> bool {
        state.is_alive()
    }

    fn accepts(&self, _state: LifeState) -> bool {
        true
    }

    fn quiescent(&self) -> Option<LifeState> {
        Some(LifeState::Empty)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn view(state: LifeState, live: &[u32], age: u32) -> SiteView<'_, LifeState> {
        SiteView {
            state,
            counts: live,
            age,
        }
    }

    #[test]
    fn conway_table() {
        let rule = LifeRule::new(LifeParams::conway()).unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        for live in 0..=8_u32 {
            let counts = [live];
            let alive_next = rule.next_state(&view(LifeState::Alive, &counts, 0), &mut rng);
            let empty_next = rule.next_state(&view(LifeState::Empty, &counts, 0), &mut rng);
            assert_eq!(alive_next.is_alive(), live == 2 || live == 3, "survive {live}");
            assert_eq!(empty_next.is_alive(), live == 3, "revive {live}");
        }
    }

    #[test]
    fn rejects_out_of_range_probabilities() {
        let mut params = LifeParams::conway();
        params.survive.insert(2, 1.5);
        assert!(matches!(
            LifeRule::new(params),
            Err(RuleConfigError::ProbabilityOutOfRange { table: "survive", key: 2, .. })
        ));

        let mut params = LifeParams::conway();
        params.revive.insert(3, -0.1);
        assert!(LifeRule::new(params).is_err());

        let params = LifeParams {
            lambda: 0.0,
            ..LifeParams::conway()
        };
        assert_eq!(
            LifeRule::new(params).unwrap_err(),
            RuleConfigError::InvalidScale(0.0)
        );
    }

    #[test]
    fn zero_probability_never_fires() {
        let params = LifeParams {
            survive: BTreeMap::from([(2, 0.0)]),
            revive: BTreeMap::new(),
            ..LifeParams::conway()
        };
        let rule = LifeRule::new(params).unwrap();
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..200 {
            assert_eq!(
                rule.next_state(&view(LifeState::Alive, &[2], 0), &mut rng),
                LifeState::Empty
            );
            assert_eq!(
                rule.next_state(&view(LifeState::Empty, &[3], 0), &mut rng),
                LifeState::Empty
            );
        }
    }

    #[test]
    fn old_cells_die_under_age_mortality() {
        let params = LifeParams {
            age_death: true,
            lambda: 1.0,
            ..LifeParams::conway()
        };
        let rule = LifeRule::new(params).unwrap();
        let mut rng = SmallRng::seed_from_u64(3);
        let deaths = (0..500)
            .filter(|_| {
                rule.next_state(&view(LifeState::Alive, &[2], 50), &mut rng) == LifeState::Empty
            })
            .count();
        // 1 - exp(-50) is indistinguishable from 1.
        assert_eq!(deaths, 500);
    }

    #[test]
    fn newborn_cells_are_safe_from_age_mortality() {
        let params = LifeParams {
            age_death: true,
            ..LifeParams::conway()
        };
        let rule = LifeRule::new(params).unwrap();
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..200 {
            assert_eq!(
                rule.next_state(&view(LifeState::Alive, &[3], 0), &mut rng),
                LifeState::Alive
            );
        }
    }

    #[test]
    fn exponential_cdf_shape() {
        assert!(exponential_cdf(0.0, 10.0).abs() < 1e-12);
        let half_life = 10.0 * core::f64::consts::LN_2;
        assert!((exponential_cdf(half_life, 10.0) - 0.5).abs() < 1e-12);
        assert!(exponential_cdf(1e6, 10.0) > 0.999_999);
    }

    #[test]
    fn params_deserialize_with_defaults() {
        let params: LifeParams = serde_yml::from_str("age_death: true\n").unwrap();
        assert!(params.age_death);
        assert_eq!(params.survive, default_survive());
        assert!((params.lambda - 1000.0).abs() < f64::EPSILON);

        let params: LifeParams =
            serde_yml::from_str("survive: {2: 0.5}\nrevive: {3: 0.25, 6: 0.1}\n").unwrap();
        assert_eq!(params.survive.get(&2).copied(), Some(0.5));
        assert_eq!(params.revive.len(), 2);
    }
}
