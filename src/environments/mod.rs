//! Ready-made implementations of the `Environment` trait.

/// The tile-elimination puzzle SameGame.
pub mod same_game;
/// An explicit tree of named actions, handy for small scenarios and tests.
pub mod scripted;
/// A stochastic benchmark tree generated from a seed.
pub mod synthetic;
