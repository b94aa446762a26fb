//! Faction control over an adjacency graph.
//!
//! Every vertex belongs to one of `k` factions or is barbarian. A vertex
//! draws a single percentage `p` in `[0, 100)` per tick and compares it
//! against four rates:
//!
//! - a barbarian joins a uniformly random faction if `p < convoke_rate`;
//! - a faction member turns barbarian if `p < chaos_rate`;
//! - otherwise its neighboring factions are visited in a freshly shuffled
//!   order, and the first one with exactly one member nearby dominates the
//!   vertex (`p < dom_rate`), while the first with two or more breaks it into
//!   barbarism (`p < break_rate`).
//!
//! The shuffle removes any bias toward low faction indices.

use automata_types::Allegiance;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::{RuleConfigError, SiteView, TransitionRule, check_rate};

/// Configuration for [`FactionRule`]. Rates are percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactionParams {
    /// Faction display names; their count is `k`.
    #[serde(default = "default_factions")]
    pub factions: Vec<String>,
    /// Chance that a faction member turns barbarian.
    #[serde(default = "default_chaos_rate")]
    pub chaos_rate: f64,
    /// Chance that a barbarian joins a random faction.
    #[serde(default = "default_convoke_rate")]
    pub convoke_rate: f64,
    /// Chance that a lone neighboring member wins the vertex over.
    #[serde(default = "default_dom_rate")]
    pub dom_rate: f64,
    /// Chance that a crowded neighboring faction breaks the vertex.
    #[serde(default = "default_break_rate")]
    pub break_rate: f64,
}

fn default_factions() -> Vec<String> {
    ["Golgari", "Boros", "Dimir"]
        .into_iter()
        .map(String::from)
        .collect()
}

const fn default_chaos_rate() -> f64 {
    1.0
}

const fn default_convoke_rate() -> f64 {
    5.0
}

const fn default_dom_rate() -> f64 {
    10.0
}

const fn default_break_rate() -> f64 {
    5.0
}

impl Default for FactionParams {
    fn default() -> Self {
        Self {
            factions: default_factions(),
            chaos_rate: default_chaos_rate(),
            convoke_rate: default_convoke_rate(),
            dom_rate: default_dom_rate(),
            break_rate: default_break_rate(),
        }
    }
}

impl FactionParams {
    /// Check the faction list and every rate.
    ///
    /// # Errors
    ///
    /// Returns [`RuleConfigError`] for an empty or oversized faction list or
    /// a negative, non-finite rate.
    pub fn validate(&self) -> Result<(), RuleConfigError> {
        if self.factions.is_empty() {
            return Err(RuleConfigError::NoFactions);
        }
        if u8::try_from(self.factions.len()).is_err() {
            return Err(RuleConfigError::TooManyFactions(self.factions.len()));
        }
        check_rate("chaos_rate", self.chaos_rate)?;
        check_rate("convoke_rate", self.convoke_rate)?;
        check_rate("dom_rate", self.dom_rate)?;
        check_rate("break_rate", self.break_rate)?;
        Ok(())
    }
}

/// Faction control rule over [`Allegiance`].
#[derive(Debug, Clone)]
pub struct FactionRule {
    params: FactionParams,
    /// Faction count, validated to fit a `u8`.
    k: u8,
}

impl FactionRule {
    /// Build a rule from validated parameters.
    ///
    /// # Errors
    ///
    /// Returns [`RuleConfigError`] if the parameters fail
    /// [`FactionParams::validate`].
    pub fn new(params: FactionParams) -> Result<Self, RuleConfigError> {
        params.validate()?;
        let Ok(k) = u8::try_from(params.factions.len()) else {
            return Err(RuleConfigError::TooManyFactions(params.factions.len()));
        };
        Ok(Self { params, k })
    }

    /// The active parameters.
    pub const fn params(&self) -> &FactionParams {
        &self.params
    }

    /// Number of factions.
    pub const fn faction_count(&self) -> u8 {
        self.k
    }

    /// Display name of `allegiance`.
    pub fn label_of(&self, allegiance: Allegiance) -> &str {
        match allegiance {
            Allegiance::Faction(i) => self
                .params
                .factions
                .get(usize::from(i))
                .map_or("unknown", String::as_str),
            Allegiance::Barbarian => "Barbarian",
        }
    }

    fn member_outcome(
        &self,
        site: &SiteView<'_, Allegiance>,
        p: f64,
        rng: &mut impl Rng,
    ) -> Option<Allegiance> {
        // `p` is continuous, so `<` and `<=` differ only on a null set; `<`
        // keeps a zero rate from ever firing.
        if p < self.params.chaos_rate {
            return Some(Allegiance::Barbarian);
        }
        let mut order: Vec<u8> = (0..self.k).collect();
        order.shuffle(rng);
        order.into_iter().find_map(|i| {
            let devotion = site.count(usize::from(i));
            if devotion == 1 && p < self.params.dom_rate {
                Some(Allegiance::Faction(i))
            } else if devotion >= 2 && p < self.params.break_rate {
                Some(Allegiance::Barbarian)
            } else {
                None
            }
        })
    }
}

impl TransitionRule for FactionRule {
    type State = Allegiance;

    fn name(&self) -> &'static str {
        "factions"
    }

    fn alphabet(&self) -> Vec<Allegiance> {
        (0..self.k)
            .map(Allegiance::Faction)
            .chain(std::iter::once(Allegiance::Barbarian))
            .collect()
    }

    fn label_count(&self) -> usize {
        usize::from(self.k).saturating_add(1)
    }

    fn classify(&self, state: Allegiance) -> Option<usize> {
        match state {
            Allegiance::Faction(i) if i < self.k => Some(usize::from(i)),
            Allegiance::Faction(_) => None,
            Allegiance::Barbarian => Some(usize::from(self.k)),
        }
    }

    fn next_state(&self, site: &SiteView<'_, Allegiance>, rng: &mut impl Rng) -> Allegiance {
        let p = rng.random_range(0.0..100.0);
        let changed = match site.state {
            // Strict comparison, as in `member_outcome`.
            Allegiance::Barbarian => (p < self.params.convoke_rate)
                .then(|| Allegiance::Faction(rng.random_range(0..self.k))),
            Allegiance::Faction(_) => self.member_outcome(site, p, rng),
        };
        changed.unwrap_or(site.state)
    }

    fn accepts(&self, state: Allegiance) -> bool {
        match state {
            Allegiance::Faction(i) => i < self.k,
            Allegiance::Barbarian => true,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn rule(chaos: f64, convoke: f64, dom: f64, brk: f64) -> FactionRule {
        FactionRule::new(FactionParams {
            chaos_rate: chaos,
            convoke_rate: convoke,
            dom_rate: dom,
            break_rate: brk,
            ..FactionParams::default()
        })
        .unwrap()
    }

    fn step(rule: &FactionRule, state: Allegiance, counts: &[u32], seed: u64) -> Allegiance {
        let view = SiteView {
            state,
            counts,
            age: 0,
        };
        rule.next_state(&view, &mut SmallRng::seed_from_u64(seed))
    }

    #[test]
    fn certain_convoke_picks_a_faction() {
        let rule = rule(0.0, 100.0, 0.0, 0.0);
        for seed in 0..50 {
            let next = step(&rule, Allegiance::Barbarian, &[0, 0, 0, 0], seed);
            assert!(matches!(next, Allegiance::Faction(i) if i < 3));
        }
    }

    #[test]
    fn certain_chaos_makes_barbarians() {
        let rule = rule(100.0, 0.0, 100.0, 0.0);
        for seed in 0..50 {
            let next = step(&rule, Allegiance::Faction(1), &[1, 0, 0, 0], seed);
            assert_eq!(next, Allegiance::Barbarian);
        }
    }

    #[test]
    fn lone_neighbor_dominates() {
        let rule = rule(0.0, 0.0, 100.0, 0.0);
        for seed in 0..50 {
            let next = step(&rule, Allegiance::Faction(0), &[0, 0, 1, 0], seed);
            assert_eq!(next, Allegiance::Faction(2));
        }
    }

    #[test]
    fn crowded_neighbor_breaks() {
        let rule = rule(0.0, 0.0, 0.0, 100.0);
        for seed in 0..50 {
            let next = step(&rule, Allegiance::Faction(0), &[0, 3, 0, 0], seed);
            assert_eq!(next, Allegiance::Barbarian);
        }
    }

    #[test]
    fn zero_rates_never_fire() {
        let rule = rule(0.0, 0.0, 0.0, 0.0);
        for seed in 0..50 {
            assert_eq!(
                step(&rule, Allegiance::Faction(0), &[1, 2, 1, 4], seed),
                Allegiance::Faction(0)
            );
            assert_eq!(
                step(&rule, Allegiance::Barbarian, &[1, 2, 1, 4], seed),
                Allegiance::Barbarian
            );
        }
    }

    #[test]
    fn one_draw_gates_chaos_and_domination() {
        // Domination needs p < 40, but any such p already triggered chaos.
        let rule = rule(50.0, 0.0, 40.0, 0.0);
        let outcomes: Vec<Allegiance> = (0..2000)
            .map(|seed| step(&rule, Allegiance::Faction(0), &[0, 1, 0, 0], seed))
            .collect();
        assert!(!outcomes.contains(&Allegiance::Faction(1)));
        let barbarians = outcomes
            .iter()
            .filter(|&&a| a == Allegiance::Barbarian)
            .count();
        let unchanged = outcomes
            .iter()
            .filter(|&&a| a == Allegiance::Faction(0))
            .count();
        assert!(barbarians > 800, "barbarians: {barbarians}");
        assert!(unchanged > 800, "unchanged: {unchanged}");
        assert_eq!(barbarians.saturating_add(unchanged), outcomes.len());
    }

    #[test]
    fn tie_break_order_is_not_fixed() {
        // Faction 0 and 2 both have a lone neighbor; the shuffle must let
        // either of them win.
        let rule = rule(0.0, 0.0, 100.0, 0.0);
        let winners: std::collections::BTreeSet<Allegiance> = (0..200)
            .map(|seed| step(&rule, Allegiance::Faction(1), &[1, 0, 1, 0], seed))
            .collect();
        assert!(winners.contains(&Allegiance::Faction(0)));
        assert!(winners.contains(&Allegiance::Faction(2)));
    }

    #[test]
    fn validation() {
        assert_eq!(
            FactionRule::new(FactionParams {
                factions: Vec::new(),
                ..FactionParams::default()
            })
            .unwrap_err(),
            RuleConfigError::NoFactions
        );
        assert!(matches!(
            FactionRule::new(FactionParams {
                dom_rate: -0.1,
                ..FactionParams::default()
            }),
            Err(RuleConfigError::InvalidRate { rate: "dom_rate", .. })
        ));
        assert!(matches!(
            FactionRule::new(FactionParams {
                factions: vec![String::from("x"); 300],
                ..FactionParams::default()
            }),
            Err(RuleConfigError::TooManyFactions(300))
        ));
    }

    #[test]
    fn alphabet_and_labels() {
        let rule = FactionRule::new(FactionParams::default()).unwrap();
        assert_eq!(rule.alphabet().len(), 4);
        assert_eq!(rule.classify(Allegiance::Barbarian), Some(3));
        assert_eq!(rule.classify(Allegiance::Faction(7)), None);
        assert!(!rule.accepts(Allegiance::Faction(3)));
        assert_eq!(rule.label_of(Allegiance::Faction(1)), "Boros");
    }
}
