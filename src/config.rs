//! Search configuration parameters.

use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};

/// Formula used to score a visited child during selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoringFormula {
    /// `q̄ + C·sqrt(ln(N)/n)`
    Ucb1,
    /// `q̄ + C·sqrt(ln(N)/n) + sqrt((SSQ − n·q̄² + D)/n)`, where `D` is `smoothing`.
    /// The smoothing keeps the variance bonus from vanishing on low-variance samples.
    VarianceAware { smoothing: f64 },
}

/// Configuration for the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Exploration constant `C`. Higher values favor less visited children.
    pub exploration_constant: f64,

    /// Scoring formula applied to children that passed their warm-up.
    pub scoring: ScoringFormula,

    /// Children with fewer visits than this score positive infinity.
    pub warm_up_visits: u32,

    /// Probability of picking a uniformly random child instead of scoring.
    /// 0.0 disables the epsilon-greedy fallback.
    pub epsilon: f64,

    /// Reject expansions that reach a state already present in the tree.
    /// Only environments that report fingerprints are affected.
    pub transposition_avoidance: bool,

    /// Avoid actions of the state's dominant category during rollouts.
    pub biased_rollouts: bool,

    /// Log progress every this many iterations. 0 disables progress logging.
    pub progress_interval: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            exploration_constant: 0.5,
            scoring: ScoringFormula::VarianceAware { smoothing: 1e5 },
            warm_up_visits: 10,
            epsilon: 0.0,
            transposition_avoidance: true,
            biased_rollouts: false,
            progress_interval: 1000,
        }
    }
}

impl SearchConfig {
    /// Settings used for the synthetic benchmark tree: plain UCB1 with `C = √2`,
    /// a short warm-up and a 30% epsilon-greedy fallback.
    pub fn for_benchmark() -> Self {
        Self {
            exploration_constant: std::f64::consts::SQRT_2,
            scoring: ScoringFormula::Ucb1,
            warm_up_visits: 5,
            epsilon: 0.3,
            transposition_avoidance: false,
            ..Default::default()
        }
    }

    /// Plain UCB1 with no warm-up and no random fallback.
    pub fn plain_ucb1(exploration_constant: f64) -> Self {
        Self {
            exploration_constant,
            scoring: ScoringFormula::Ucb1,
            warm_up_visits: 0,
            epsilon: 0.0,
            ..Default::default()
        }
    }

    /// Parses a configuration from JSON. Missing fields take their default values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SearchConfig =
            serde_json::from_str(json).map_err(|e| SearchError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_exploration_constant(mut self, c: f64) -> Self {
        self.exploration_constant = c;
        self
    }

    pub fn with_scoring(mut self, scoring: ScoringFormula) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn with_warm_up_visits(mut self, visits: u32) -> Self {
        self.warm_up_visits = visits;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_transposition_avoidance(mut self, enabled: bool) -> Self {
        self.transposition_avoidance = enabled;
        self
    }

    pub fn with_biased_rollouts(mut self, enabled: bool) -> Self {
        self.biased_rollouts = enabled;
        self
    }

    pub fn with_progress_interval(mut self, interval: u32) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Rejects values the selection formulas cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !self.exploration_constant.is_finite() || self.exploration_constant < 0.0 {
            return Err(SearchError::InvalidConfig(format!(
                "exploration_constant must be a finite non-negative number, got {}",
                self.exploration_constant
            )));
        }

        if let ScoringFormula::VarianceAware { smoothing } = self.scoring {
            if !smoothing.is_finite() || smoothing < 0.0 {
                return Err(SearchError::InvalidConfig(format!(
                    "variance smoothing must be a finite non-negative number, got {}",
                    smoothing
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(SearchError::InvalidConfig(format!(
                "epsilon must be within [0, 1], got {}",
                self.epsilon
            )));
        }

        Ok(())
    }
}
