use crate::environment::Environment;

/// Represents a single node in the search tree.
///
/// Each node owns an independent copy of the environment, the action that produced it,
/// and the statistics collected by backpropagation.
#[derive(Debug, Clone)]
pub struct MctsNode<E: Environment> {
    /// A unique identifier within the tree, assigned in creation order.
    pub id: usize,
    /// The depth of the node below the tree's root.
    pub depth: usize,
    /// The environment state this node represents.
    pub state: E,
    /// The action that led to this node's state from its parent. `None` for the root node.
    pub action: Option<E::Action>,
    /// Legal actions not yet expanded into children, computed on first use.
    untried_actions: Option<Vec<E::Action>>,
    /// The number of backpropagation paths that included this node.
    pub visits: u64,
    /// Sum of the rewards propagated through this node.
    pub reward_sum: f64,
    /// Sum of the squared rewards propagated through this node.
    pub reward_sum_sq: f64,
    /// Set once the tree policy finds the node childless with a terminal state. Never cleared.
    pub is_terminal: bool,
}

impl<E: Environment> MctsNode<E> {
    /// Creates a new unvisited node.
    pub fn new(id: usize, depth: usize, state: E, action: Option<E::Action>) -> Self {
        MctsNode {
            id,
            depth,
            state,
            action,
            untried_actions: None,
            visits: 0,
            reward_sum: 0.0,
            reward_sum_sq: 0.0,
            is_terminal: false,
        }
    }

    /// Mean reward of the simulations through this node.
    pub fn mean_reward(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.reward_sum / (self.visits as f64)
        }
    }

    /// Sample variance of the rewards through this node.
    pub fn reward_variance(&self) -> f64 {
        if self.visits == 0 {
            return 0.0;
        }
        let n = self.visits as f64;
        let mean = self.reward_sum / n;
        (self.reward_sum_sq / n - mean * mean).max(0.0)
    }

    /// Pops the next untried action. Actions are consumed from the back of the
    /// legal-action list.
    pub fn take_untried_action(&mut self) -> Option<E::Action> {
        let state = &self.state;
        self.untried_actions
            .get_or_insert_with(|| state.legal_actions())
            .pop()
    }

    /// Adds one simulation result to the statistics.
    pub(crate) fn record(&mut self, reward: f64) {
        self.visits += 1;
        self.reward_sum += reward;
        self.reward_sum_sq += reward * reward;
    }
}

impl<E: Environment> PartialEq<Self> for MctsNode<E> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<E: Environment> Eq for MctsNode<E> {}

impl<E: Environment> std::hash::Hash for MctsNode<E> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
