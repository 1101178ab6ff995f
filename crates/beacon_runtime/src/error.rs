//! Runtime error types.

use thiserror::Error;

/// Failure reported by a query backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The backend ran the statement and it failed
    #[error("{0}")]
    Failed(String),

    /// The backend has no answer for this statement
    #[error("No result for statement: {0}")]
    UnknownStatement(String),
}

/// Terminal failure recorded on a run node
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    /// The node's query failed
    #[error("Query failed: {0}")]
    QueryFailed(#[from] QueryError),

    /// A nested resource is not in the catalog
    #[error("Child not found: {0}")]
    UnresolvedChild(String),

    /// The named query is not in the catalog, or has no SQL
    #[error("Query not found: {0}")]
    UnresolvedQuery(String),

    /// An argument is bound to an input with no value
    #[error("No value for input '{0}'")]
    MissingInput(String),

    /// The task running the node panicked
    #[error("Task running {0} panicked")]
    TaskPanicked(String),

    /// The node nests one of its own ancestors
    #[error("Cycle detected: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
}
