use crate::environment::Environment;
use crate::error::{Result, SearchError};
use crate::random::RandomGenerator;

/// The best reward observed by any simulation, with the full action sequence that
/// produced it, counted from the environment's start.
#[derive(Debug, Clone, PartialEq)]
pub struct Incumbent<A> {
    reward: f64,
    sequence: Vec<A>,
    updates: u64,
}

impl<A> Default for Incumbent<A> {
    fn default() -> Self {
        Self {
            reward: f64::NEG_INFINITY,
            sequence: Vec::new(),
            updates: 0,
        }
    }
}

impl<A> Incumbent<A> {
    /// Returns the best reward seen so far, or `None` before the first simulation.
    pub fn reward(&self) -> Option<f64> {
        if self.updates == 0 {
            None
        } else {
            Some(self.reward)
        }
    }

    pub fn sequence(&self) -> &[A] {
        &self.sequence
    }

    /// How many times a strictly better reward replaced the previous one.
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Returns true if `reward` would replace the incumbent.
    pub fn is_improved_by(&self, reward: f64) -> bool {
        self.updates == 0 || reward > self.reward
    }

    /// Replaces the incumbent if `reward` is strictly better.
    pub fn offer(&mut self, reward: f64, sequence: Vec<A>) -> bool {
        if !self.is_improved_by(reward) {
            return false;
        }
        self.reward = reward;
        self.sequence = sequence;
        self.updates += 1;
        true
    }
}

/// The result of one playout.
#[derive(Debug, Clone, PartialEq)]
pub struct Rollout<A> {
    /// Cumulative reward of the environment once the playout ended.
    pub reward: f64,
    /// Actions taken during the playout, starting at the leaf.
    pub actions: Vec<A>,
}

/// Returns the actions a rollout may choose from.
///
/// When `biased` is set, actions in the state's dominant category are dropped unless that
/// leaves nothing to play.
pub fn rollout_actions<E: Environment>(state: &E, biased: bool) -> Vec<E::Action> {
    let legal = state.legal_actions();
    if !biased {
        return legal;
    }

    let Some(dominant) = state.dominant_category() else {
        return legal;
    };

    let filtered: Vec<E::Action> = legal
        .iter()
        .filter(|action| state.action_category(action) != Some(dominant))
        .cloned()
        .collect();

    if filtered.is_empty() { legal } else { filtered }
}

/// Plays uniformly random actions from a copy of `state` until it is terminal.
/// The state itself is never modified.
pub fn rollout<E: Environment, K: RandomGenerator>(
    state: &E,
    biased: bool,
    random: &mut K,
) -> Result<Rollout<E::Action>> {
    let mut env = state.clone();
    let mut actions = Vec::new();

    while !env.is_terminal() {
        let candidates = rollout_actions(&env, biased);
        let Some(action) = random.choose(&candidates).cloned() else {
            return Err(SearchError::EnvironmentContract(
                "state is not terminal but offers no legal actions".to_string(),
            ));
        };

        env.step(&action).map_err(|err| {
            SearchError::EnvironmentContract(format!(
                "legal action {:?} was rejected during a rollout: {}",
                action, err
            ))
        })?;
        actions.push(action);
    }

    Ok(Rollout {
        reward: env.cumulative_reward(),
        actions,
    })
}
