//! A single-agent Monte Carlo tree search planner.
//!
//! Given an environment that can be cloned, stepped and asked for its legal actions and
//! cumulative reward, the planner searches for the action sequence with the highest reward.
//! It runs the usual select, expand, simulate and backpropagate loop, scores children with
//! UCB1 or a variance-aware variant, optionally skips transpositions, and keeps the best
//! rollout ever seen so that a lucky playout is never lost to the shape of the tree.
//!
//! # Example
//!
//! ```rust
//! use mcts_planner::config::SearchConfig;
//! use mcts_planner::environments::scripted::ScriptedEnvironment;
//! use mcts_planner::mcts::MonteCarloTreeSearch;
//! use mcts_planner::random::SeededRandomGenerator;
//!
//! // Two actions from the start: `A` pays 10, `B` costs 5
//! let env = ScriptedEnvironment::two_armed(10.0, -5.0);
//!
//! // Create and configure a new planner using the builder
//! let mut mcts = MonteCarloTreeSearch::builder(env)
//!     .with_random_generator(SeededRandomGenerator::new(7))
//!     .with_config(SearchConfig::plain_ucb1(0.5))
//!     .build()
//!     .unwrap();
//!
//! // Spend the whole budget on one tree and extract the best sequence
//! let outcome = mcts.run_once(100).unwrap();
//!
//! assert_eq!(outcome.actions, vec!["A"]);
//! assert_eq!(outcome.reward, 10.0);
//! ```

/// Search parameters and their validation.
pub mod config;
/// The `Environment` trait that connects a domain to the planner.
pub mod environment;
/// Pre-made environments.
pub mod environments;
/// The error type shared by the whole crate.
pub mod error;
/// Plain-text Graphviz export of a search tree.
pub mod export;
/// The core module of the library, containing the `MonteCarloTreeSearch` implementation.
pub mod mcts;
/// Contains the `MctsNode` struct, which represents a node in the search tree.
pub mod mcts_node;
/// Contains traits and implementations for random number generation.
pub mod random;
/// Child scoring and tie-breaking.
pub mod selection;
/// Rollouts and the best-rollout incumbent.
pub mod simulation;
/// The arena holding the nodes of one search.
pub mod tree;
