use crate::environment::Environment;
use crate::error::{Result, SearchError};
use crate::mcts_node::MctsNode;
use ego_tree::{NodeId, NodeRef, Tree};
use log::trace;
use std::collections::HashSet;

/// The search tree: an arena of [`MctsNode`]s addressed by stable [`NodeId`]s.
///
/// The tree owns everything that used to be process-wide in a search: the node counter
/// and the set of state fingerprints already present (when transposition avoidance is on).
/// The current root is an index into the arena, so re-rooting never invalidates other nodes.
pub struct SearchTree<E: Environment> {
    tree: Tree<MctsNode<E>>,
    root_id: NodeId,
    seen_states: HashSet<u64>,
    transposition_avoidance: bool,
    next_node_id: usize,
    nodes_created: usize,
}

impl<E: Environment> SearchTree<E> {
    /// Creates a single-node tree holding `state`.
    pub fn new(state: E, transposition_avoidance: bool) -> Self {
        let mut seen_states = HashSet::new();
        if transposition_avoidance {
            if let Some(fingerprint) = state.fingerprint() {
                seen_states.insert(fingerprint);
            }
        }

        let tree = Tree::new(MctsNode::new(0, 0, state, None));
        let root_id = tree.root().id();
        Self {
            tree,
            root_id,
            seen_states,
            transposition_avoidance,
            next_node_id: 1,
            nodes_created: 0,
        }
    }

    /// Returns the id of the current root.
    pub fn root_id(&self) -> NodeId {
        self.root_id
    }

    /// Returns the current root node.
    pub fn root(&self) -> Result<NodeRef<'_, MctsNode<E>>> {
        self.get(self.root_id)
    }

    /// Returns the number of nodes created by expansion since the tree was built.
    pub fn nodes_created(&self) -> usize {
        self.nodes_created
    }

    pub fn transposition_avoidance(&self) -> bool {
        self.transposition_avoidance
    }

    pub fn get(&self, node_id: NodeId) -> Result<NodeRef<'_, MctsNode<E>>> {
        self.tree.get(node_id).ok_or_else(|| unknown_node(node_id))
    }

    /// Returns the data of a node.
    pub fn node(&self, node_id: NodeId) -> Result<&MctsNode<E>> {
        Ok(self.get(node_id)?.value())
    }

    pub fn children(&self, node_id: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.get(node_id)?.children().map(|child| child.id()).collect())
    }

    pub fn has_children(&self, node_id: NodeId) -> Result<bool> {
        Ok(self.get(node_id)?.has_children())
    }

    pub fn is_terminal(&self, node_id: NodeId) -> Result<bool> {
        Ok(self.node(node_id)?.is_terminal)
    }

    /// Marks a childless node as terminal. The flag is never cleared.
    pub fn mark_terminal(&mut self, node_id: NodeId) -> Result<()> {
        let node = self.get(node_id)?;
        if node.has_children() {
            return Err(SearchError::EnvironmentContract(format!(
                "node {} has children and cannot become terminal",
                node.value().id
            )));
        }

        let mut node = self.tree.get_mut(node_id).ok_or_else(|| unknown_node(node_id))?;
        node.value().is_terminal = true;
        Ok(())
    }

    /// Expands one untried action of `node_id` into a new child.
    ///
    /// Returns `None` when no untried action remains. With transposition avoidance on,
    /// actions whose resulting state is already in the tree are consumed without creating
    /// a child.
    pub fn expand_one(&mut self, node_id: NodeId) -> Result<Option<NodeId>> {
        loop {
            let mut node = self.tree.get_mut(node_id).ok_or_else(|| unknown_node(node_id))?;
            let Some(action) = node.value().take_untried_action() else {
                return Ok(None);
            };

            let depth = node.value().depth + 1;
            let mut state = node.value().state.clone();
            state.step(&action).map_err(|err| {
                SearchError::EnvironmentContract(format!(
                    "legal action {:?} was rejected: {}",
                    action, err
                ))
            })?;

            if self.transposition_avoidance {
                if let Some(fingerprint) = state.fingerprint() {
                    if !self.seen_states.insert(fingerprint) {
                        trace!("skipping {:?}: state {:x} is already in the tree", action, fingerprint);
                        continue;
                    }
                }
            }

            let child = MctsNode::new(self.next_node_id, depth, state, Some(action));
            self.next_node_id += 1;
            self.nodes_created += 1;
            return Ok(Some(node.append(child).id()));
        }
    }

    /// Adds `reward` to every node from `leaf` up to the current root inclusive.
    /// Returns the updated path, leaf first.
    pub fn backpropagate(&mut self, leaf: NodeId, reward: f64) -> Result<Vec<NodeId>> {
        let mut branch = Vec::new();
        let mut current = Some(leaf);

        while let Some(node_id) = current {
            let mut node = self.tree.get_mut(node_id).ok_or_else(|| unknown_node(node_id))?;
            node.value().record(reward);
            branch.push(node_id);

            if node_id == self.root_id {
                return Ok(branch);
            }
            current = node.parent().map(|parent| parent.id());
        }

        Err(SearchError::UnknownNode(format!(
            "{:?} is not below the current root",
            leaf
        )))
    }

    /// Returns the actions leading from the current root to `node_id`.
    pub fn actions_from_root(&self, node_id: NodeId) -> Result<Vec<E::Action>> {
        let mut actions = Vec::new();
        let mut node = self.get(node_id)?;

        while node.id() != self.root_id {
            let action = node.value().action.clone().ok_or_else(|| {
                SearchError::UnknownNode(format!("{:?} is not below the current root", node_id))
            })?;
            actions.push(action);
            node = node.parent().ok_or_else(|| {
                SearchError::UnknownNode(format!("{:?} is not below the current root", node_id))
            })?;
        }

        actions.reverse();
        Ok(actions)
    }

    /// Moves the root to one of its children. Siblings stay in the arena but are no
    /// longer reachable from the root.
    pub fn advance_root(&mut self, child_id: NodeId) -> Result<()> {
        let child = self.get(child_id)?;
        let is_child = child.parent().map(|parent| parent.id()) == Some(self.root_id);
        if !is_child {
            return Err(SearchError::InvalidAction(format!(
                "{:?} is not a child of the current root",
                child.value().action
            )));
        }
        self.root_id = child_id;
        Ok(())
    }

    /// Iterates over every node reachable from the current root, root first.
    pub fn live_nodes(&self) -> impl Iterator<Item = &MctsNode<E>> + '_ {
        self.tree
            .get(self.root_id)
            .into_iter()
            .flat_map(|root| root.descendants())
            .map(|node| node.value())
    }
}

fn unknown_node(node_id: NodeId) -> SearchError {
    SearchError::UnknownNode(format!("{:?}", node_id))
}
