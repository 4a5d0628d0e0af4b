use crate::config::{ScoringFormula, SearchConfig};
use crate::environment::Environment;
use crate::error::{Result, SearchError};
use crate::mcts_node::MctsNode;
use crate::random::RandomGenerator;
use crate::tree::SearchTree;
use ego_tree::NodeId;

/// Scores the children of a node and picks the subtree to descend into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionPolicy {
    exploration_constant: f64,
    scoring: ScoringFormula,
    warm_up_visits: u32,
    epsilon: f64,
}

impl SelectionPolicy {
    pub fn new(
        exploration_constant: f64,
        scoring: ScoringFormula,
        warm_up_visits: u32,
        epsilon: f64,
    ) -> Self {
        Self {
            exploration_constant,
            scoring,
            warm_up_visits,
            epsilon,
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(
            config.exploration_constant,
            config.scoring,
            config.warm_up_visits,
            config.epsilon,
        )
    }

    /// Scores a child given its parent's visit count.
    ///
    /// Children that are unvisited or still inside their warm-up score positive infinity.
    pub fn score<E: Environment>(&self, parent_visits: u64, child: &MctsNode<E>) -> f64 {
        let n = child.visits;
        if n == 0 || n < u64::from(self.warm_up_visits) {
            return f64::INFINITY;
        }

        let n = n as f64;
        let q_bar = child.reward_sum / n;
        let parent_visits = parent_visits.max(1) as f64;
        let ucb1 = q_bar + self.exploration_constant * f64::sqrt(f64::ln(parent_visits) / n);

        match self.scoring {
            ScoringFormula::Ucb1 => ucb1,
            ScoringFormula::VarianceAware { smoothing } => {
                let spread = (child.reward_sum_sq - n * q_bar * q_bar + smoothing).max(0.0);
                ucb1 + f64::sqrt(spread / n)
            }
        }
    }

    /// Picks the child of `node_id` with the highest score.
    ///
    /// Ties at the maximum are broken uniformly at random. With a non-zero epsilon, a
    /// uniformly random child is returned with that probability before any scoring.
    pub fn select_best_child<E: Environment, K: RandomGenerator>(
        &self,
        tree: &SearchTree<E>,
        node_id: NodeId,
        random: &mut K,
    ) -> Result<NodeId> {
        let node = tree.get(node_id)?;
        if !node.has_children() {
            return Err(SearchError::EmptySelection(node.value().id));
        }

        if self.epsilon > 0.0 && random.next_unit() < self.epsilon {
            let children: Vec<NodeId> = node.children().map(|child| child.id()).collect();
            return Ok(children[random.next_index(children.len())]);
        }

        let parent_visits = node.value().visits;
        let mut max_score = f64::NEG_INFINITY;
        let mut best = Vec::new();
        for child in node.children() {
            let score = self.score(parent_visits, child.value());
            if score > max_score {
                max_score = score;
                best.clear();
                best.push(child.id());
            } else if score == max_score {
                best.push(child.id());
            }
        }

        // NaN scores never compare; fall back to every child rather than an empty pick.
        if best.is_empty() {
            best = node.children().map(|child| child.id()).collect();
        }

        Ok(best[random.next_index(best.len())])
    }
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self::from_config(&SearchConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ScoringFormula;
    use crate::environments::scripted::ScriptedEnvironment;
    use crate::error::SearchError;
    use crate::mcts_node::MctsNode;
    use crate::random::SeededRandomGenerator;
    use crate::selection::SelectionPolicy;
    use crate::tree::SearchTree;

    fn node_with(rewards: &[f64]) -> MctsNode<ScriptedEnvironment> {
        let mut node = MctsNode::new(1, 1, ScriptedEnvironment::two_armed(1.0, 0.0), None);
        for reward in rewards {
            node.record(*reward);
        }
        node
    }

    #[test]
    fn unvisited_and_warming_up_children_score_infinity() {
        let policy = SelectionPolicy::new(0.5, ScoringFormula::Ucb1, 3, 0.0);

        assert_eq!(policy.score(10, &node_with(&[])), f64::INFINITY);
        assert_eq!(policy.score(10, &node_with(&[1.0, 1.0])), f64::INFINITY);
        assert!(policy.score(10, &node_with(&[1.0, 1.0, 1.0])).is_finite());
    }

    #[test]
    fn ucb1_score_matches_formula() {
        let policy = SelectionPolicy::new(0.5, ScoringFormula::Ucb1, 0, 0.0);
        let child = node_with(&[2.0, 4.0]);

        let expected = 3.0 + 0.5 * f64::sqrt(f64::ln(8.0) / 2.0);
        assert!((policy.score(8, &child) - expected).abs() < 1e-12);
    }

    #[test]
    fn variance_aware_score_adds_smoothed_spread() {
        let policy = SelectionPolicy::new(
            0.5,
            ScoringFormula::VarianceAware { smoothing: 1e4 },
            0,
            0.0,
        );
        let child = node_with(&[2.0, 4.0]);

        // ssq = 20, n * q_bar^2 = 18
        let expected = 3.0 + 0.5 * f64::sqrt(f64::ln(8.0) / 2.0) + f64::sqrt((20.0 - 18.0 + 1e4) / 2.0);
        assert!((policy.score(8, &child) - expected).abs() < 1e-9);
    }

    #[test]
    fn selecting_from_a_childless_node_fails() {
        let tree = SearchTree::new(ScriptedEnvironment::two_armed(1.0, 0.0), false);
        let mut random = SeededRandomGenerator::default();

        let err = SelectionPolicy::default()
            .select_best_child(&tree, tree.root_id(), &mut random)
            .unwrap_err();

        assert_eq!(err, SearchError::EmptySelection(0));
    }

    #[test]
    fn ties_are_broken_across_all_tied_children() {
        // arrange
        let mut tree = SearchTree::new(ScriptedEnvironment::two_armed(1.0, 0.0), false);
        let root = tree.root_id();
        let first = tree.expand_one(root).unwrap().unwrap();
        let second = tree.expand_one(root).unwrap().unwrap();
        let policy = SelectionPolicy::default();
        let mut random = SeededRandomGenerator::new(7);

        // act
        let mut picked_first = 0;
        let mut picked_second = 0;
        for _ in 0..200 {
            let picked = policy.select_best_child(&tree, root, &mut random).unwrap();
            if picked == first {
                picked_first += 1;
            } else if picked == second {
                picked_second += 1;
            }
        }

        // assert
        assert_eq!(picked_first + picked_second, 200);
        assert!(picked_first > 50);
        assert!(picked_second > 50);
    }

    #[test]
    fn epsilon_picks_uniformly_regardless_of_scores() {
        // arrange
        let mut tree = SearchTree::new(ScriptedEnvironment::two_armed(1.0, 0.0), false);
        let root = tree.root_id();
        let strong = tree.expand_one(root).unwrap().unwrap();
        let weak = tree.expand_one(root).unwrap().unwrap();
        for _ in 0..100 {
            tree.backpropagate(strong, 1000.0).unwrap();
            tree.backpropagate(weak, 0.0).unwrap();
        }
        let greedy = SelectionPolicy::new(0.0, ScoringFormula::Ucb1, 0, 0.0);
        let random_only = SelectionPolicy::new(0.0, ScoringFormula::Ucb1, 0, 1.0);
        let mut random = SeededRandomGenerator::new(3);

        // act
        let mut picked_weak = 0;
        for _ in 0..1000 {
            if random_only.select_best_child(&tree, root, &mut random).unwrap() == weak {
                picked_weak += 1;
            }
        }

        // assert
        assert_eq!(greedy.select_best_child(&tree, root, &mut random).unwrap(), strong);
        assert!(picked_weak > 400);
        assert!(picked_weak < 600);
    }

    #[test]
    fn unvisited_child_beats_visited_children() {
        // arrange
        let mut tree = SearchTree::new(ScriptedEnvironment::two_armed(1.0, 0.0), false);
        let root = tree.root_id();
        let visited = tree.expand_one(root).unwrap().unwrap();
        let unvisited = tree.expand_one(root).unwrap().unwrap();
        for _ in 0..100 {
            tree.backpropagate(visited, 1000.0).unwrap();
        }
        let policy = SelectionPolicy::new(0.0, ScoringFormula::Ucb1, 0, 0.0);
        let mut random = SeededRandomGenerator::default();

        // act
        let picked = policy.select_best_child(&tree, root, &mut random).unwrap();

        // assert
        assert_eq!(picked, unvisited);
    }
}
