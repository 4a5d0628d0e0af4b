use thiserror::Error;

/// Errors raised by the search engine and by environments driven by it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    /// A step or a commit used an action outside the current legal-action set.
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Selection was asked to pick a child of a node that has none.
    #[error("Cannot select a child of node {0}: it has no children")]
    EmptySelection(usize),

    /// The environment reported something inconsistent with its own contract,
    /// for example rejecting an action it listed as legal.
    #[error("Environment contract violated: {0}")]
    EnvironmentContract(String),

    /// A tree index did not resolve to a live node.
    #[error("Unknown tree node: {0}")]
    UnknownNode(String),

    /// The configuration or a call argument is malformed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience Result type for search operations.
pub type Result<T> = std::result::Result<T, SearchError>;
