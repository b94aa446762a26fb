//! Two-species predator/prey automaton.
//!
//! Prey follow Life-like survive/birth sets over their own neighbor count.
//! A prey cell touching any predator is converted into one. A predator with
//! no prey in reach starves; one that is neither converting nor starving
//! falls back to the prey outcome, which is always Empty for a predator
//! cell. Predators therefore persist only by converting adjacent prey.

use std::collections::BTreeSet;

use automata_types::Species;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{RuleConfigError, SiteView, TransitionRule};

/// Label under which prey neighbors are counted.
pub const PREY: usize = 0;

/// Label under which predator neighbors are counted.
pub const PREDATOR: usize = 1;

/// Configuration for [`PredatorPreyRule`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredatorPreyParams {
    /// Prey-neighbor counts under which a prey cell survives.
    #[serde(default = "default_survive")]
    pub survive: BTreeSet<u32>,
    /// Prey-neighbor counts under which an empty cell spawns prey.
    #[serde(default = "default_birth")]
    pub birth: BTreeSet<u32>,
}

fn default_survive() -> BTreeSet<u32> {
    BTreeSet::from([2, 3])
}

fn default_birth() -> BTreeSet<u32> {
    BTreeSet::from([3])
}

impl Default for PredatorPreyParams {
    fn default() -> Self {
        Self {
            survive: default_survive(),
            birth: default_birth(),
        }
    }
}

/// Predator/prey rule over [`Species`]. Fully deterministic.
#[derive(Debug, Clone, Default)]
pub struct PredatorPreyRule {
    params: PredatorPreyParams,
}

impl PredatorPreyRule {
    /// Build a rule from its survive/birth sets.
    ///
    /// # Errors
    ///
    /// Currently infallible; kept fallible so every rule family is built the
    /// same way.
    #[allow(clippy::unnecessary_wraps)]
    pub const fn new(params: PredatorPreyParams) -> Result<Self, RuleConfigError> {
        Ok(Self { params })
    }

    /// The active parameters.
    pub const fn params(&self) -> &PredatorPreyParams {
        &self.params
    }

    fn prey_outcome(&self, state: Species, prey: u32) -> Species {
        let stays = match state {
            Species::Prey => self.params.survive.contains(&prey),
            Species::Empty => self.params.birth.contains(&prey),
            Species::Predator => false,
        };
        if stays { Species::Prey } else { Species::Empty }
    }
}

impl TransitionRule for PredatorPreyRule {
    type State = Species;

    fn name(&self) -> &'static str {
        "predator_prey"
    }

    fn alphabet(&self) -> Vec<Species> {
        vec![Species::Empty, Species::Prey, Species::Predator]
    }

    fn label_count(&self) -> usize {
        2
    }

    fn classify(&self, state: Species) -> Option<usize> {
        match state {
            Species::Empty => None,
            Species::Prey => Some(PREY),
            Species::Predator => Some(PREDATOR),
        }
    }

    fn next_state(&self, site: &SiteView<'_, Species>, _rng: &mut impl Rng) -> Species {
        let prey = site.count(PREY);
        match site.state {
            Species::Prey if site.count(PREDATOR) > 0 => Species::Predator,
            Species::Predator if prey == 0 => Species::Empty,
            state => self.prey_outcome(state, prey),
        }
    }

    fn accepts(&self, _state: Species) -> bool {
        true
    }

    fn quiescent(&self) -> Option<Species> {
        Some(Species::Empty)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn step(rule: &PredatorPreyRule, state: Species, prey: u32, predators: u32) -> Species {
        let counts = [prey, predators];
        let view = SiteView {
            state,
            counts: &counts,
            age: 0,
        };
        rule.next_state(&view, &mut SmallRng::seed_from_u64(0))
    }

    #[test]
    fn prey_follow_survive_and_birth_sets() {
        let rule = PredatorPreyRule::default();
        assert_eq!(step(&rule, Species::Prey, 2, 0), Species::Prey);
        assert_eq!(step(&rule, Species::Prey, 4, 0), Species::Empty);
        assert_eq!(step(&rule, Species::Empty, 3, 0), Species::Prey);
        assert_eq!(step(&rule, Species::Empty, 2, 0), Species::Empty);
    }

    #[test]
    fn adjacent_predator_converts_prey() {
        let rule = PredatorPreyRule::default();
        assert_eq!(step(&rule, Species::Prey, 0, 1), Species::Predator);
        assert_eq!(step(&rule, Species::Prey, 3, 5), Species::Predator);
    }

    #[test]
    fn predators_starve_or_vanish() {
        let rule = PredatorPreyRule::default();
        assert_eq!(step(&rule, Species::Predator, 0, 0), Species::Empty);
        assert_eq!(step(&rule, Species::Predator, 0, 3), Species::Empty);
        assert_eq!(step(&rule, Species::Predator, 2, 0), Species::Empty);
    }

    #[test]
    fn empty_cells_ignore_predators() {
        let rule = PredatorPreyRule::default();
        assert_eq!(step(&rule, Species::Empty, 0, 8), Species::Empty);
    }

    #[test]
    fn custom_sets_from_yaml() {
        let params: PredatorPreyParams = serde_yml::from_str("birth: [3, 6]\n").unwrap();
        let rule = PredatorPreyRule::new(params).unwrap();
        assert_eq!(step(&rule, Species::Empty, 6, 0), Species::Prey);
        assert_eq!(step(&rule, Species::Prey, 3, 0), Species::Prey);
    }
}
