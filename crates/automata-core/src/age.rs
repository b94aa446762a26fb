//! Per-site age bookkeeping.
//!
//! A site's age counts the consecutive ticks it has spent in an age-eligible
//! state (for Life, "alive"). Ages are only touched after a tick's commit,
//! from the pre-tick and post-tick snapshots, so no rule ever observes an age
//! produced during the tick it is evaluating.

/// Consecutive-tick persistence counters, one per site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgeTracker {
    ages: Vec<u32>,
}

impl AgeTracker {
    /// Create a tracker with every age at zero.
    pub fn new(sites: usize) -> Self {
        Self {
            ages: vec![0; sites],
        }
    }

    /// Age of `site`, or `None` if the site is out of range.
    pub fn get(&self, site: usize) -> Option<u32> {
        self.ages.get(site).copied()
    }

    /// All ages in arena order.
    pub fn as_slice(&self) -> &[u32] {
        &self.ages
    }

    /// Reset a single site to age zero.
    pub fn reset(&mut self, site: usize) {
        if let Some(age) = self.ages.get_mut(site) {
            *age = 0;
        }
    }

    /// Reset every site to age zero.
    pub fn reset_all(&mut self) {
        self.ages.fill(0);
    }

    /// Fold one committed tick into the counters.
    ///
    /// A site ages by one if it was eligible before the tick and is still
    /// eligible after it; otherwise its age drops to zero. A site that just
    /// became eligible (a birth) therefore starts at zero.
    pub fn advance<S, F>(&mut self, before: &[S], after: &[S], eligible: F)
    where
        S: Copy,
        F: Fn(S) -> bool,
    {
        for ((age, &was), &now) in self.ages.iter_mut().zip(before).zip(after) {
            *age = if eligible(was) && eligible(now) {
                age.saturating_add(1)
            } else {
                0
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use automata_types::LifeState;

    use super::*;

    #[test]
    fn persisting_site_ages_and_leaving_resets() {
        let mut tracker = AgeTracker::new(1);
        let alive = [LifeState::Alive];
        let empty = [LifeState::Empty];
        for expected in 1..=5_u32 {
            tracker.advance(&alive, &alive, LifeState::is_alive);
            assert_eq!(tracker.get(0), Some(expected));
        }
        tracker.advance(&alive, &empty, LifeState::is_alive);
        assert_eq!(tracker.get(0), Some(0));
    }

    #[test]
    fn birth_starts_at_zero() {
        let mut tracker = AgeTracker::new(1);
        tracker.advance(&[LifeState::Empty], &[LifeState::Alive], LifeState::is_alive);
        assert_eq!(tracker.get(0), Some(0));
        tracker.advance(&[LifeState::Alive], &[LifeState::Alive], LifeState::is_alive);
        assert_eq!(tracker.get(0), Some(1));
    }

    #[test]
    fn reset_clears_single_site() {
        let mut tracker = AgeTracker::new(2);
        let alive = [LifeState::Alive, LifeState::Alive];
        tracker.advance(&alive, &alive, LifeState::is_alive);
        tracker.reset(1);
        assert_eq!(tracker.as_slice(), &[1, 0]);
        tracker.reset_all();
        assert_eq!(tracker.as_slice(), &[0, 0]);
        assert_eq!(tracker.get(2), None);
    }
}
