//! Scheduler configuration.

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Upper bound on children of one node running at once; `None` is unbounded
    pub max_parallel_children: Option<usize>,
    /// Whether status transitions are sent to the event sink
    pub emit_events: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_parallel_children: None,
            emit_events: true,
        }
    }
}

impl SchedulerConfig {
    /// Bound child parallelism; zero is treated as one
    #[must_use]
    pub fn with_max_parallel_children(mut self, limit: usize) -> Self {
        self.max_parallel_children = Some(limit.max(1));
        self
    }

    /// Enable or disable event emission
    #[must_use]
    pub fn with_events(mut self, emit: bool) -> Self {
        self.emit_events = emit;
        self
    }

    /// Number of children a node may have in flight
    #[must_use]
    pub(crate) fn child_limit(&self) -> usize {
        self.max_parallel_children.unwrap_or(usize::MAX)
    }
}
