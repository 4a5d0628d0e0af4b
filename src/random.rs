use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DEFAULT_SEED: u64 = 3819201;

/// The random stream threaded through selection tie-breaks, epsilon-greedy picks and rollouts.
pub trait RandomGenerator: Default {
    /// Returns an index in `0..len`. Returns 0 without drawing when `len <= 1`.
    fn next_index(&mut self, len: usize) -> usize;

    /// Returns a float in `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    fn choose<'a, K>(&mut self, items: &'a [K]) -> Option<&'a K> {
        if items.is_empty() {
            return None;
        }
        items.get(self.next_index(items.len()))
    }
}

/// Draws from the thread-local generator. Runs are not reproducible.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardRandomGenerator;

impl RandomGenerator for StandardRandomGenerator {
    fn next_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        rand::rng().random_range(0..len)
    }

    fn next_unit(&mut self) -> f64 {
        rand::rng().random::<f64>()
    }
}

/// A seedable generator. Two instances built from the same seed produce the same stream.
#[derive(Debug, Clone)]
pub struct SeededRandomGenerator {
    rng: StdRng,
}

impl SeededRandomGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for SeededRandomGenerator {
    fn default() -> Self {
        SeededRandomGenerator::new(DEFAULT_SEED)
    }
}

impl RandomGenerator for SeededRandomGenerator {
    fn next_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.rng.random_range(0..len)
    }

    fn next_unit(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}
