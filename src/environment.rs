use crate::error::Result;
use std::fmt::Debug;

/// The central trait of the library, defining the interface for a single-agent environment.
///
/// To plan in a custom domain, this trait must be implemented.
/// The search engine never looks inside the state: it clones it, steps it, and reads its
/// legal actions and cumulative reward. A clone must be fully independent of the original,
/// stepping one never changes what the other reports.
pub trait Environment: Clone {
    /// The type representing an action. This could be a board coordinate, a direction,
    /// or any other value the environment understands.
    type Action: Clone + Debug + PartialEq;

    /// Returns every action that is legal in the current state.
    /// An empty list means the episode is over.
    fn legal_actions(&self) -> Vec<Self::Action>;

    /// Applies an action in place and accrues its reward.
    ///
    /// Must fail with [`SearchError::InvalidAction`](crate::error::SearchError::InvalidAction)
    /// when the action is not currently legal.
    fn step(&mut self, action: &Self::Action) -> Result<()>;

    /// Returns the reward collected since the environment's start.
    fn cumulative_reward(&self) -> f64;

    /// Returns true once no further action can be taken.
    fn is_terminal(&self) -> bool {
        self.legal_actions().is_empty()
    }

    /// Returns a fingerprint of the current state, used to avoid transpositions.
    /// Environments that return `None` are never deduplicated.
    fn fingerprint(&self) -> Option<u64> {
        None
    }

    /// Returns the category an action belongs to, used by biased rollouts.
    fn action_category(&self, _action: &Self::Action) -> Option<u32> {
        None
    }

    /// Returns the least informative category of the current state.
    /// Biased rollouts avoid actions of this category whenever another action exists.
    fn dominant_category(&self) -> Option<u32> {
        None
    }
}
