use std::time::Duration;

use parking_lot::Mutex;
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Source of retry delays. Injectable so tests can pin timing down.
pub trait BackoffJitter: Send + Sync {
    fn next_delay(&self) -> Duration;
}

const BASE_DELAY: Duration = Duration::from_millis(100);
const SPREAD_MS: u64 = 100;

/// Uniform random delay in `[100, 200)` ms between resolution attempts, so
/// concurrent planners don't hammer the metadata layer in lockstep.
#[derive(Debug)]
pub struct RandomBackoff {
    rng: Mutex<StdRng>,
}

impl RandomBackoff {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomBackoff {
    fn default() -> Self {
        Self::new()
    }
}

impl BackoffJitter for RandomBackoff {
    fn next_delay(&self) -> Duration {
        BASE_DELAY + Duration::from_millis(self.rng.lock().gen_range(0..SPREAD_MS))
    }
}

/// Constant delay, for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedBackoff(pub Duration);

impl BackoffJitter for FixedBackoff {
    fn next_delay(&self) -> Duration {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_backoff_stays_within_the_window() {
        let backoff = RandomBackoff::seeded(7);
        for _ in 0..100 {
            let delay = backoff.next_delay();
            assert!(delay >= Duration::from_millis(100));
            assert!(delay < Duration::from_millis(200));
        }
    }

    #[test]
    fn seeded_backoff_is_deterministic() {
        let a = RandomBackoff::seeded(42);
        let b = RandomBackoff::seeded(42);
        let delays_a: Vec<_> = (0..10).map(|_| a.next_delay()).collect();
        let delays_b: Vec<_> = (0..10).map(|_| b.next_delay()).collect();
        assert_eq!(delays_a, delays_b);
    }
}
