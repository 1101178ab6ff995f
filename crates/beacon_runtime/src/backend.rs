//! Query-execution backend seam.
//!
//! The engine never runs SQL itself. Each node with a query hands a
//! `QueryRequest` to a `QueryBackend` and awaits the row set.

use crate::error::QueryError;
use async_trait::async_trait;
use beacon_core::QualifiedName;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// A compiled query with bound parameter values
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    /// Node issuing the query
    pub node: QualifiedName,
    /// SQL text
    pub sql: String,
    /// Bound arguments by parameter name
    pub args: IndexMap<String, Value>,
}

/// Rows returned by a query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowSet {
    /// Column names
    pub columns: Vec<String>,
    /// Row values, one inner vector per row
    pub rows: Vec<Vec<Value>>,
}

impl RowSet {
    /// Create a row set
    #[must_use]
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Executes queries on behalf of run nodes
///
/// Timeouts and retries are the backend's business.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Run one query
    async fn execute(&self, request: QueryRequest) -> Result<RowSet, QueryError>;
}

/// Canned answers for `MemoryBackend`, loadable from JSON
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixtures {
    /// SQL text -> rows
    #[serde(default)]
    pub results: IndexMap<String, RowSet>,
    /// SQL text -> error message
    #[serde(default)]
    pub failures: IndexMap<String, String>,
    /// SQL text -> artificial latency in milliseconds
    #[serde(default)]
    pub delays_ms: IndexMap<String, u64>,
}

/// In-process backend answering from a fixed table, keyed by SQL text
#[derive(Debug, Default)]
pub struct MemoryBackend {
    results: IndexMap<String, RowSet>,
    failures: IndexMap<String, String>,
    delays: IndexMap<String, Duration>,
    dispatched: Mutex<Vec<QueryRequest>>,
}

impl MemoryBackend {
    /// Create an empty backend; every statement is unknown
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from fixtures
    #[must_use]
    pub fn from_fixtures(fixtures: Fixtures) -> Self {
        Self {
            results: fixtures.results,
            failures: fixtures.failures,
            delays: fixtures
                .delays_ms
                .into_iter()
                .map(|(sql, ms)| (sql, Duration::from_millis(ms)))
                .collect(),
            dispatched: Mutex::new(Vec::new()),
        }
    }

    /// Answer `sql` with `rows`
    #[must_use]
    pub fn with_result(mut self, sql: impl Into<String>, rows: RowSet) -> Self {
        self.results.insert(sql.into(), rows);
        self
    }

    /// Fail `sql` with `message`
    #[must_use]
    pub fn with_failure(mut self, sql: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.insert(sql.into(), message.into());
        self
    }

    /// Delay the answer to `sql`
    #[must_use]
    pub fn with_delay(mut self, sql: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(sql.into(), delay);
        self
    }

    /// Every request received so far, in arrival order
    #[must_use]
    pub fn dispatched(&self) -> Vec<QueryRequest> {
        self.dispatched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether a request for `node` has been received
    #[must_use]
    pub fn was_dispatched(&self, node: &QualifiedName) -> bool {
        self.dispatched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|request| &request.node == node)
    }
}

#[async_trait]
impl QueryBackend for MemoryBackend {
    async fn execute(&self, request: QueryRequest) -> Result<RowSet, QueryError> {
        let sql = request.sql.clone();
        self.dispatched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        if let Some(delay) = self.delays.get(&sql) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(message) = self.failures.get(&sql) {
            return Err(QueryError::Failed(message.clone()));
        }
        self.results
            .get(&sql)
            .cloned()
            .ok_or(QueryError::UnknownStatement(sql))
    }
}
