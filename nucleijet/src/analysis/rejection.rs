//! Random event down-sampling.

use rand::Rng;

use crate::analysis::config::EventConfig;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EventRejector {
    pub enabled: bool,
    /// Percentage of events dropped, 0 to 100.
    pub percentage: u32,
}

impl EventRejector {
    pub fn new(config: &EventConfig) -> Self {
        EventRejector {
            enabled: config.reject_events,
            percentage: config.rejection_percentage.min(100),
        }
    }

    /// Draws a uniform integer in [0, 100) and rejects when it lies below the percentage,
    /// so exactly `percentage` of the 100 values reject. A draw equal to the percentage
    /// keeps the event.
    pub fn should_reject<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        if !self.enabled {
            return false;
        }
        rng.gen_range(0..100u32) < self.percentage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rejector(percentage: u32) -> EventRejector {
        EventRejector::new(&EventConfig { reject_events: true, rejection_percentage: percentage })
    }

    #[test]
    fn test_extremes() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!((0..1000).all(|_| rejector(100).should_reject(&mut rng)));
        assert!((0..1000).all(|_| !rejector(0).should_reject(&mut rng)));
    }

    #[test]
    fn test_draw_equal_to_percentage_is_kept() {
        // always draws 0
        let mut zero = StepRng::new(0, 0);
        assert!(!rejector(0).should_reject(&mut zero));
        assert!(rejector(1).should_reject(&mut zero));
    }

    #[test]
    fn test_disabled_never_rejects() {
        let disabled = EventRejector::new(&EventConfig { reject_events: false, rejection_percentage: 100 });
        let mut rng = StdRng::seed_from_u64(7);
        assert!(!disabled.should_reject(&mut rng));
    }

    #[test]
    fn test_seeded_draws_are_reproducible() {
        let draws = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..200).map(|_| rejector(30).should_reject(&mut rng)).collect::<Vec<_>>()
        };
        assert_eq!(draws(11), draws(11));
        let rejected = draws(11).iter().filter(|r| **r).count();
        assert!(rejected > 20 && rejected < 100);
    }
}
