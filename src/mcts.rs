use crate::config::SearchConfig;
use crate::environment::Environment;
use crate::error::{Result, SearchError};
use crate::export;
use crate::random::{RandomGenerator, StandardRandomGenerator};
use crate::selection::SelectionPolicy;
use crate::simulation::{self, Incumbent};
use crate::tree::SearchTree;
use ego_tree::NodeId;
use log::{debug, error, info, trace, warn};

/// The main struct for running the Monte Carlo Tree Search planner.
///
/// It owns the search tree, the random number generator, the best rollout seen so far,
/// and the actions already committed to. Several instances can run side by side in one
/// process; none of them shares state with another.
pub struct MonteCarloTreeSearch<E: Environment, K: RandomGenerator> {
    tree: SearchTree<E>,
    config: SearchConfig,
    policy: SelectionPolicy,
    random: K,
    incumbent: Incumbent<E::Action>,
    committed: Vec<E::Action>,
    iterations: u64,
    next_action: MctsAction,
}

/// A builder for creating instances of `MonteCarloTreeSearch`.
pub struct MonteCarloTreeSearchBuilder<E: Environment, K: RandomGenerator> {
    env: E,
    random_generator: K,
    config: SearchConfig,
}

impl<E: Environment, K: RandomGenerator> MonteCarloTreeSearchBuilder<E, K> {
    /// Creates a new builder planning from the given initial environment.
    pub fn new(env: E) -> Self {
        Self {
            env,
            random_generator: K::default(),
            config: SearchConfig::default(),
        }
    }

    /// Sets the random number generator threaded through selection and rollouts.
    pub fn with_random_generator(mut self, rg: K) -> Self {
        self.random_generator = rg;
        self
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the `MonteCarloTreeSearch` instance. Fails if the configuration is invalid.
    pub fn build(self) -> Result<MonteCarloTreeSearch<E, K>> {
        MonteCarloTreeSearch::new(self.env, self.random_generator, self.config)
    }
}

impl<E: Environment, K: RandomGenerator> MonteCarloTreeSearch<E, K> {
    /// Returns a new builder for `MonteCarloTreeSearch`.
    pub fn builder(env: E) -> MonteCarloTreeSearchBuilder<E, K> {
        MonteCarloTreeSearchBuilder::new(env)
    }

    /// Creates a new `MonteCarloTreeSearch` instance.
    ///
    /// It is recommended to use the builder pattern via `MonteCarloTreeSearch::builder()` instead.
    pub fn new(env: E, rg: K, config: SearchConfig) -> Result<Self> {
        config.validate()?;
        let tree = SearchTree::new(env, config.transposition_avoidance);
        let root_id = tree.root_id();

        Ok(Self {
            tree,
            policy: SelectionPolicy::from_config(&config),
            config,
            random: rg,
            incumbent: Incumbent::default(),
            committed: Vec::new(),
            iterations: 0,
            next_action: MctsAction::TreePolicy {
                root: root_id,
                last_path: vec![],
            },
        })
    }

    /// Returns an immutable reference to the underlying search tree.
    pub fn get_tree(&self) -> &SearchTree<E> {
        &self.tree
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Returns the best rollout seen so far.
    pub fn incumbent(&self) -> &Incumbent<E::Action> {
        &self.incumbent
    }

    /// Returns the actions committed by replanning so far.
    pub fn committed_actions(&self) -> &[E::Action] {
        &self.committed
    }

    /// Returns the number of completed iterations since this instance was built.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Returns the number of nodes created in the current tree.
    pub fn nodes_created(&self) -> usize {
        self.tree.nodes_created()
    }

    /// Returns the next MCTS action to be performed. Useful for debugging and visualization.
    pub fn get_next_mcts_action(&self) -> &MctsAction {
        &self.next_action
    }

    /// Renders the tree below the current root as a Graphviz graph.
    pub fn to_graphviz(&self) -> Result<String> {
        export::to_graphviz(&self.tree)
    }

    /// Executes a single step of the loop: tree policy, simulation, or backpropagation.
    pub fn execute_action(&mut self) -> Result<()> {
        self.next_action = match self.next_action.clone() {
            MctsAction::TreePolicy { root, .. } => {
                let leaf = self.tree_policy(root)?;
                MctsAction::Simulation { leaf }
            }
            MctsAction::Simulation { leaf } => {
                let reward = self.simulate(leaf)?;
                MctsAction::Backpropagation { leaf, reward }
            }
            MctsAction::Backpropagation { leaf, reward } => {
                let last_path = self.tree.backpropagate(leaf, reward)?;
                self.iterations += 1;
                MctsAction::TreePolicy {
                    root: self.tree.root_id(),
                    last_path,
                }
            }
        };
        Ok(())
    }

    /// Performs one full iteration of the loop.
    /// Returns the path of nodes that were updated during backpropagation, leaf first.
    pub fn do_iteration(&mut self) -> Result<Vec<NodeId>> {
        self.execute_action()?;
        while !matches!(self.next_action, MctsAction::TreePolicy { .. }) {
            self.execute_action()?;
        }

        match &self.next_action {
            MctsAction::TreePolicy { last_path, .. } => Ok(last_path.clone()),
            _ => Ok(vec![]),
        }
    }

    /// Runs the loop for a specified number of iterations from the current root.
    pub fn iterate_n_times(&mut self, n: u32) -> Result<()> {
        let interval = self.config.progress_interval;
        for iteration in 0..n {
            if interval > 0 && iteration > 0 && iteration % interval == 0 {
                info!(
                    "iteration {}/{}: {} nodes created, best reward {:?}",
                    iteration,
                    n,
                    self.tree.nodes_created(),
                    self.incumbent.reward()
                );
            }
            self.do_iteration()?;
        }
        Ok(())
    }

    /// Single-shot planning: spends the whole budget on one tree, then returns the greedy
    /// path from the root or the best rollout, whichever scored higher.
    pub fn run_once(&mut self, iteration_budget: u32) -> Result<SearchOutcome<E::Action>> {
        check_budget(iteration_budget)?;
        self.iterate_n_times(iteration_budget)
            .inspect_err(|err| error!("search halted: {}", err))?;

        let mut current = self.tree.root_id();
        while self.tree.has_children(current)? {
            current = self
                .policy
                .select_best_child(&self.tree, current, &mut self.random)?;
        }

        let node = self.tree.node(current)?;
        let tree_reward = node
            .state
            .is_terminal()
            .then(|| node.state.cumulative_reward());
        let mut actions = self.committed.clone();
        actions.extend(self.tree.actions_from_root(current)?);

        Ok(self.finish(actions, tree_reward))
    }

    /// Replanning: spends `iteration_budget_per_move` iterations, commits to the root's best
    /// child, and repeats from the new root until the episode ends.
    pub fn run_replanning(
        &mut self,
        iteration_budget_per_move: u32,
        mode: ReplanMode,
    ) -> Result<SearchOutcome<E::Action>> {
        check_budget(iteration_budget_per_move)?;

        loop {
            let root_id = self.tree.root_id();
            let root = self.tree.node(root_id)?;
            if root.is_terminal || root.state.is_terminal() {
                break;
            }

            self.iterate_n_times(iteration_budget_per_move)
                .inspect_err(|err| error!("search halted: {}", err))?;

            if !self.tree.has_children(root_id)? {
                if !self.tree.is_terminal(root_id)? {
                    warn!(
                        "every action from the current root leads to a known state; stopping after {} moves",
                        self.committed.len()
                    );
                }
                break;
            }

            let best = self
                .policy
                .select_best_child(&self.tree, root_id, &mut self.random)?;
            self.commit(best, mode)?;
        }

        let root = self.tree.node(self.tree.root_id())?;
        let tree_reward = root
            .state
            .is_terminal()
            .then(|| root.state.cumulative_reward());
        Ok(self.finish(self.committed.clone(), tree_reward))
    }

    /// Descends from `start` to a new or terminal leaf, expanding one node on the way.
    fn tree_policy(&mut self, start: NodeId) -> Result<NodeId> {
        let mut current = start;
        loop {
            if self.tree.is_terminal(current)? {
                return Ok(current);
            }

            if let Some(child) = self.tree.expand_one(current)? {
                return Ok(child);
            }

            if self.tree.has_children(current)? {
                current = self
                    .policy
                    .select_best_child(&self.tree, current, &mut self.random)?;
                continue;
            }

            // Childless with nothing left to expand. When transpositions swallowed the
            // remaining actions the environment can still move, so the node stays open.
            if self.tree.node(current)?.state.is_terminal() {
                self.tree.mark_terminal(current)?;
            }
            return Ok(current);
        }
    }

    /// Plays out a copy of the leaf state and offers the result to the incumbent.
    fn simulate(&mut self, leaf: NodeId) -> Result<f64> {
        let node = self.tree.node(leaf)?;
        let rollout =
            simulation::rollout(&node.state, self.config.biased_rollouts, &mut self.random)?;

        if self.incumbent.is_improved_by(rollout.reward) {
            let mut sequence = self.committed.clone();
            sequence.extend(self.tree.actions_from_root(leaf)?);
            sequence.extend(rollout.actions);
            trace!("new best rollout reward {}", rollout.reward);
            self.incumbent.offer(rollout.reward, sequence);
        }

        Ok(rollout.reward)
    }

    /// Commits to `child` of the current root.
    fn commit(&mut self, child: NodeId, mode: ReplanMode) -> Result<()> {
        let root_id = self.tree.root_id();
        let node = self.tree.node(child)?;
        let action = node.action.clone().ok_or_else(|| {
            SearchError::InvalidAction("cannot commit to the root of the tree".to_string())
        })?;

        let root_state = &self.tree.node(root_id)?.state;
        if !root_state.legal_actions().contains(&action) {
            return Err(SearchError::InvalidAction(format!(
                "{:?} is not legal in the current state",
                action
            )));
        }

        debug!(
            "move {}: committing to {:?} (visits {}, mean reward {:.3}, {} nodes created)",
            self.committed.len() + 1,
            action,
            node.visits,
            node.mean_reward(),
            self.tree.nodes_created()
        );

        match mode {
            ReplanMode::InPlace => self.tree.advance_root(child)?,
            ReplanMode::Reset => {
                let state = self.tree.node(child)?.state.clone();
                self.tree = SearchTree::new(state, self.tree.transposition_avoidance());
            }
        }

        self.committed.push(action);
        self.next_action = MctsAction::TreePolicy {
            root: self.tree.root_id(),
            last_path: vec![],
        };
        Ok(())
    }

    fn finish(&self, actions: Vec<E::Action>, tree_reward: Option<f64>) -> SearchOutcome<E::Action> {
        let incumbent_reward = self.incumbent.reward();
        let tree_wins = match (tree_reward, incumbent_reward) {
            (Some(tree), Some(best)) => tree > best,
            (Some(_), None) => true,
            (None, _) => false,
        };

        let outcome = if tree_wins {
            SearchOutcome {
                actions,
                reward: tree_reward.unwrap_or(f64::NEG_INFINITY),
                source: SequenceSource::Tree,
                iterations: self.iterations,
                nodes_created: self.tree.nodes_created(),
            }
        } else {
            SearchOutcome {
                actions: self.incumbent.sequence().to_vec(),
                reward: incumbent_reward.unwrap_or(f64::NEG_INFINITY),
                source: SequenceSource::Incumbent,
                iterations: self.iterations,
                nodes_created: self.tree.nodes_created(),
            }
        };

        info!(
            "search finished after {} iterations: reward {} from {:?} ({} actions)",
            outcome.iterations,
            outcome.reward,
            outcome.source,
            outcome.actions.len()
        );
        outcome
    }
}

impl<E: Environment> MonteCarloTreeSearch<E, StandardRandomGenerator> {
    pub fn from_env(env: E) -> Result<Self> {
        MonteCarloTreeSearchBuilder::new(env).build()
    }
}

fn check_budget(iteration_budget: u32) -> Result<()> {
    if iteration_budget == 0 {
        return Err(SearchError::InvalidConfig(
            "iteration budget must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// How the tree is treated after committing to a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplanMode {
    /// Keep the tree and move the root to the committed child.
    InPlace,
    /// Throw the tree away and start a fresh one from the committed state.
    Reset,
}

/// Where the returned action sequence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceSource {
    /// The greedy path through the tree, or the committed moves when replanning.
    Tree,
    /// The best standalone rollout, which scored at least as well as the tree.
    Incumbent,
}

/// The result of a search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome<A> {
    /// Actions to play from the environment's start.
    pub actions: Vec<A>,
    /// Cumulative reward reached by playing `actions`.
    pub reward: f64,
    pub source: SequenceSource,
    /// Iterations completed since the planner was built.
    pub iterations: u64,
    /// Nodes created in the tree that was live at the end of the search.
    pub nodes_created: usize,
}

/// Represents the stages of one iteration of the search loop.
#[derive(Debug, PartialEq, Clone)]
pub enum MctsAction {
    /// **Tree policy**: descend from `root`, expanding the first node with untried actions.
    TreePolicy {
        /// The root the descent starts from.
        root: NodeId,
        /// The nodes updated by the previous backpropagation, leaf first.
        last_path: Vec<NodeId>,
    },
    /// **Simulation**: play out a random episode from `leaf`.
    Simulation { leaf: NodeId },
    /// **Backpropagation**: add `reward` to every node from `leaf` to the root.
    Backpropagation { leaf: NodeId, reward: f64 },
}

impl MctsAction {
    /// Returns the name of the current MCTS action as a string.
    pub fn get_name(&self) -> &'static str {
        match self {
            MctsAction::TreePolicy { .. } => "TreePolicy",
            MctsAction::Simulation { .. } => "Simulation",
            MctsAction::Backpropagation { .. } => "Backpropagation",
        }
    }
}
