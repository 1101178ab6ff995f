//! BEACON Runtime
//!
//! Builds a run tree for a dashboard and executes it concurrently: one task
//! per node, children joined by their parent, failures propagated upward.
//! Input changes re-run only the nodes that depend on the changed input.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod config;
pub mod error;
pub mod node;
pub mod scheduler;

pub use backend::{Fixtures, MemoryBackend, QueryBackend, QueryRequest, RowSet};
pub use config::SchedulerConfig;
pub use error::{NodeError, QueryError};
pub use node::{NodeResult, RunContext, RunNode};
pub use scheduler::{RunTree, Scheduler};
