use crate::environment::Environment;
use crate::error::{Result, SearchError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Shape of a [`SyntheticTree`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticTreeParams {
    /// Failure probability for nodes of the "fragile" kind.
    pub fragile_failure_probability: f64,
    /// Failures after which a fragile path ends.
    pub fragile_failure_limit: u32,
    /// Failure probability for nodes of the "sturdy" kind.
    pub sturdy_failure_probability: f64,
    /// Failures after which a sturdy path ends.
    pub sturdy_failure_limit: u32,
    /// Successes of the negative binomial branching distribution.
    pub branching_successes: u32,
    /// Success probability of the negative binomial branching distribution.
    pub branching_probability: f64,
    pub reward_mean: f64,
    pub reward_std_dev: f64,
}

impl Default for SyntheticTreeParams {
    fn default() -> Self {
        Self {
            fragile_failure_probability: 0.4,
            fragile_failure_limit: 4,
            sturdy_failure_probability: 0.2,
            sturdy_failure_limit: 16,
            branching_successes: 20,
            branching_probability: 0.75,
            reward_mean: 100.0,
            reward_std_dev: 20.0,
        }
    }
}

/// A stochastic benchmark tree with no underlying game.
///
/// Every node draws its kind, whether it adds a failure, its branching factor and its
/// reward from a generator seeded by the hash of the path leading to it, so the tree is
/// random but identical for every clone and every visit. A path ends once its failures
/// reach the limit of the node's kind. Only the reward of the final node counts.
#[derive(Debug, Clone)]
pub struct SyntheticTree {
    params: SyntheticTreeParams,
    reward_distribution: Normal<f64>,
    path_hash: u64,
    depth: u32,
    failures: u32,
    branching: usize,
    reward: f64,
}

impl SyntheticTree {
    pub fn new(seed: u64) -> Result<Self> {
        Self::with_params(seed, SyntheticTreeParams::default())
    }

    pub fn with_params(seed: u64, params: SyntheticTreeParams) -> Result<Self> {
        if params.reward_std_dev.is_nan() || params.reward_std_dev < 0.0 {
            return Err(SearchError::InvalidConfig(format!(
                "reward standard deviation must be non-negative, got {}",
                params.reward_std_dev
            )));
        }

        let reward_distribution = Normal::new(params.reward_mean, params.reward_std_dev)
            .map_err(|e| SearchError::InvalidConfig(format!("reward distribution: {}", e)))?;

        for p in [
            params.fragile_failure_probability,
            params.sturdy_failure_probability,
            params.branching_probability,
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(SearchError::InvalidConfig(format!(
                    "probability must be within [0, 1], got {}",
                    p
                )));
            }
        }
        if params.branching_probability == 0.0 {
            return Err(SearchError::InvalidConfig(
                "branching probability must be positive".to_string(),
            ));
        }

        let mut tree = Self {
            params,
            reward_distribution,
            path_hash: mix(seed),
            depth: 1,
            failures: 0,
            branching: 0,
            reward: 0.0,
        };
        tree.draw_node();
        Ok(tree)
    }

    /// Depth of the current node, the start being at depth 1.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Reward drawn for the current node.
    pub fn node_reward(&self) -> f64 {
        self.reward
    }

    fn draw_node(&mut self) {
        let mut rng = StdRng::seed_from_u64(self.path_hash);
        let params = &self.params;

        let fragile = rng.random::<f64>() > 0.5;
        let (failure_probability, failure_limit) = if fragile {
            (params.fragile_failure_probability, params.fragile_failure_limit)
        } else {
            (params.sturdy_failure_probability, params.sturdy_failure_limit)
        };

        if rng.random::<f64>() < failure_probability {
            self.failures += 1;
        }

        self.branching = if self.failures >= failure_limit {
            0
        } else {
            // failures before the requested number of successes
            let mut successes = 0;
            let mut misses = 0;
            while successes < params.branching_successes {
                if rng.random_bool(params.branching_probability) {
                    successes += 1;
                } else {
                    misses += 1;
                }
            }
            misses.max(1)
        };

        self.reward = self.reward_distribution.sample(&mut rng);
    }
}

impl Environment for SyntheticTree {
    type Action = usize;

    fn legal_actions(&self) -> Vec<Self::Action> {
        (0..self.branching).collect()
    }

    fn step(&mut self, action: &Self::Action) -> Result<()> {
        if *action >= self.branching {
            return Err(SearchError::InvalidAction(format!(
                "child {} of a node with {} children",
                action, self.branching
            )));
        }

        self.path_hash = mix(self.path_hash ^ mix(*action as u64 + 1));
        self.depth += 1;
        self.draw_node();
        Ok(())
    }

    fn cumulative_reward(&self) -> f64 {
        if self.is_terminal() { self.reward } else { 0.0 }
    }

    fn is_terminal(&self) -> bool {
        self.branching == 0
    }

    fn fingerprint(&self) -> Option<u64> {
        Some(self.path_hash)
    }
}

/// SplitMix64 finalizer.
fn mix(value: u64) -> u64 {
    let mut z = value.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
