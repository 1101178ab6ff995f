//! Event types for the presentation stream.
//!
//! One event is emitted per run node status transition. The JSON form of
//! `NodeEvent` is the only wire format this layer defines.

use beacon_core::{ResultId, RunId};
use serde::{Deserialize, Serialize};

/// Externally observable status of a run node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Waiting for an input value
    Blocked,
    /// Runnable, or dispatched and running
    Ready,
    /// Own work and every child finished
    Complete,
    /// Failed; never retried within the run
    Error,
}

impl RunStatus {
    /// Whether no further transition can happen without a reset
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }

    /// Lowercase name, as on the wire
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blocked => "blocked",
            Self::Ready => "ready",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single status transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEvent {
    /// Run session that produced the event
    pub run_id: RunId,
    /// Qualified name of the node
    pub node: String,
    /// New status
    pub status: RunStatus,
    /// Error message, when `status` is `Error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Handle to the node's result rows, when it has any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultId>,
}

impl NodeEvent {
    /// Create an event with no error and no result
    #[must_use]
    pub fn new(run_id: RunId, node: impl Into<String>, status: RunStatus) -> Self {
        Self {
            run_id,
            node: node.into(),
            status,
            error: None,
            result: None,
        }
    }

    /// Attach an error message
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Attach a result handle
    #[must_use]
    pub fn with_result(mut self, result: ResultId) -> Self {
        self.result = Some(result);
        self
    }

    /// Whether this event ends the node's run
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
