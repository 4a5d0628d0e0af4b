use crate::environment::Environment;
use crate::error::{Result, SearchError};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::rc::Rc;

/// One state of a [`ScriptedEnvironment`]: the reward collected when entering it and
/// the named actions leading out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptNode {
    pub reward: f64,
    pub children: Vec<(String, ScriptNode)>,
}

impl ScriptNode {
    /// A terminal state.
    pub fn leaf(reward: f64) -> Self {
        Self {
            reward,
            children: Vec::new(),
        }
    }

    pub fn branch(reward: f64, children: Vec<(&str, ScriptNode)>) -> Self {
        Self {
            reward,
            children: children
                .into_iter()
                .map(|(name, node)| (name.to_string(), node))
                .collect(),
        }
    }
}

/// An environment described by an explicit finite tree of named actions.
///
/// The script is shared between clones; each clone only tracks its own position in it,
/// so cloning is cheap and stepping a clone never affects the original.
#[derive(Debug, Clone)]
pub struct ScriptedEnvironment {
    script: Rc<ScriptNode>,
    path: Vec<usize>,
    total_reward: f64,
}

impl ScriptedEnvironment {
    pub fn new(script: ScriptNode) -> Self {
        Self {
            script: Rc::new(script),
            path: Vec::new(),
            total_reward: 0.0,
        }
    }

    /// Two actions from the start, `A` and `B`, each ending the episode with the given reward.
    pub fn two_armed(reward_a: f64, reward_b: f64) -> Self {
        Self::new(ScriptNode::branch(
            0.0,
            vec![
                ("A", ScriptNode::leaf(reward_a)),
                ("B", ScriptNode::leaf(reward_b)),
            ],
        ))
    }

    fn current(&self) -> &ScriptNode {
        let mut node = self.script.as_ref();
        for index in &self.path {
            node = &node.children[*index].1;
        }
        node
    }
}

impl Environment for ScriptedEnvironment {
    type Action = String;

    fn legal_actions(&self) -> Vec<Self::Action> {
        self.current()
            .children
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn step(&mut self, action: &Self::Action) -> Result<()> {
        let (index, reward) = self
            .current()
            .children
            .iter()
            .enumerate()
            .find(|(_, (name, _))| name == action)
            .map(|(index, (_, node))| (index, node.reward))
            .ok_or_else(|| SearchError::InvalidAction(action.clone()))?;

        self.path.push(index);
        self.total_reward += reward;
        Ok(())
    }

    fn cumulative_reward(&self) -> f64 {
        self.total_reward
    }

    fn fingerprint(&self) -> Option<u64> {
        let mut hasher = DefaultHasher::new();
        self.path.hash(&mut hasher);
        Some(hasher.finish())
    }
}

#[cfg(test)]
mod tests {
    use crate::environment::Environment;
    use crate::environments::scripted::{ScriptNode, ScriptedEnvironment};
    use crate::error::SearchError;

    #[test]
    fn steps_follow_the_script() {
        let mut env = ScriptedEnvironment::new(ScriptNode::branch(
            0.0,
            vec![("X", ScriptNode::branch(1.5, vec![("Y", ScriptNode::leaf(2.0))]))],
        ));

        assert_eq!(env.legal_actions(), vec!["X"]);
        env.step(&"X".to_string()).unwrap();
        assert_eq!(env.legal_actions(), vec!["Y"]);
        env.step(&"Y".to_string()).unwrap();

        assert!(env.is_terminal());
        assert_eq!(env.cumulative_reward(), 3.5);
    }

    #[test]
    fn unknown_actions_are_rejected() {
        let mut env = ScriptedEnvironment::two_armed(1.0, 2.0);

        let err = env.step(&"C".to_string()).unwrap_err();

        assert_eq!(err, SearchError::InvalidAction("C".to_string()));
        assert_eq!(env.cumulative_reward(), 0.0);
        assert_eq!(env.legal_actions().len(), 2);
    }

    #[test]
    fn clones_are_independent() {
        let env = ScriptedEnvironment::two_armed(1.0, 2.0);
        let mut copy = env.clone();

        copy.step(&"B".to_string()).unwrap();

        assert_eq!(env.cumulative_reward(), 0.0);
        assert_eq!(env.legal_actions(), vec!["A", "B"]);
        assert_ne!(env.fingerprint(), copy.fingerprint());
    }
}
