//! Scheduler and run tree.
//!
//! The scheduler turns a dashboard from a merged catalog into a run tree.
//! A run tree is one run session: it owns the node tree, the bound input
//! values and the event sink, and re-runs only the affected subtrees when
//! an input value changes.

use crate::backend::QueryBackend;
use crate::config::SchedulerConfig;
use crate::node::{NodeResult, RunContext, RunNode};
use beacon_catalog::Catalog;
use beacon_core::{CoreError, CoreResult, QualifiedName, ResourceKind, RunId};
use beacon_log::{EventSink, RunStatus};
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use std::sync::Arc;

/// Builds run trees over a shared, read-only catalog
pub struct Scheduler {
    catalog: Arc<Catalog>,
    backend: Arc<dyn QueryBackend>,
    config: SchedulerConfig,
}

impl Scheduler {
    /// Create a scheduler
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, backend: Arc<dyn QueryBackend>, config: SchedulerConfig) -> Self {
        Self {
            catalog,
            backend,
            config,
        }
    }

    /// Build and initialise the run tree for `dashboard`
    ///
    /// The initial status of every node is reported to `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if `dashboard` does not name a dashboard in the catalog
    pub fn build(
        &self,
        dashboard: &QualifiedName,
        inputs: IndexMap<String, Value>,
        sink: Arc<dyn EventSink>,
    ) -> CoreResult<RunTree> {
        if dashboard.kind() != ResourceKind::Dashboard {
            return Err(CoreError::Validation {
                field: "dashboard".to_string(),
                reason: format!("'{}' is a {}, not a dashboard", dashboard, dashboard.kind()),
            });
        }
        let resource = self.catalog.get(dashboard).ok_or_else(|| CoreError::NotFound {
            kind: "dashboard".to_string(),
            id: dashboard.to_string(),
        })?;

        let mut root = RunNode::new(Arc::clone(resource));
        root.initialise(&self.catalog, dashboard, &inputs);

        let tree = RunTree {
            run_id: RunId::new(),
            dashboard: dashboard.clone(),
            catalog: Arc::clone(&self.catalog),
            backend: Arc::clone(&self.backend),
            sink,
            config: self.config.clone(),
            inputs,
            root,
        };
        tree.context().emit_subtree(&tree.root);
        tracing::info!(run_id = %tree.run_id, dashboard = %dashboard, nodes = tree.len(), "run tree built");
        Ok(tree)
    }

    /// Build and execute in one step
    ///
    /// # Errors
    ///
    /// See `build`
    pub async fn run(
        &self,
        dashboard: &QualifiedName,
        inputs: IndexMap<String, Value>,
        sink: Arc<dyn EventSink>,
    ) -> CoreResult<RunTree> {
        let mut tree = self.build(dashboard, inputs, sink)?;
        tree.execute().await;
        Ok(tree)
    }
}

/// One dashboard run session
pub struct RunTree {
    run_id: RunId,
    dashboard: QualifiedName,
    catalog: Arc<Catalog>,
    backend: Arc<dyn QueryBackend>,
    sink: Arc<dyn EventSink>,
    config: SchedulerConfig,
    inputs: IndexMap<String, Value>,
    root: RunNode,
}

impl RunTree {
    fn context(&self) -> RunContext {
        RunContext {
            run_id: self.run_id,
            backend: Arc::clone(&self.backend),
            sink: Arc::clone(&self.sink),
            inputs: Arc::new(self.inputs.clone()),
            config: self.config.clone(),
        }
    }

    /// Execute every ready node, returning the root status
    pub async fn execute(&mut self) -> RunStatus {
        let ctx = self.context();
        tracing::info!(run_id = %self.run_id, dashboard = %self.dashboard, "run started");
        self.root.execute(&ctx).await;
        let status = self.root.status();
        tracing::info!(run_id = %self.run_id, dashboard = %self.dashboard, status = %status, "run finished");
        status
    }

    /// Bind a new value to an input and re-run whatever depends on it
    ///
    /// Returns the affected node names. Those nodes and their descendants
    /// are re-initialised; each is executed again once every ancestor has
    /// finished its own work. Nodes outside the affected subtrees keep their
    /// status and result.
    pub async fn set_input(&mut self, name: impl Into<String>, value: Value) -> IndexSet<String> {
        let name = name.into();
        self.inputs.insert(name.clone(), value);
        let affected = self.root.inputs_depending_on(&name);
        tracing::info!(run_id = %self.run_id, input = %name, affected = affected.len(), "input changed");
        if affected.is_empty() {
            return affected;
        }

        let before = self.statuses();
        let ctx = self.context();

        let mut reset = IndexSet::new();
        {
            let mut targets = Vec::new();
            self.root.reset_targets(&affected, &mut Vec::new(), true, &mut targets);
            for (ancestors, _, node) in &mut targets {
                node.reinitialise(&self.catalog, &self.dashboard, &self.inputs, ancestors);
                node.walk(&mut |n| {
                    reset.insert(n.name().to_string());
                });
                ctx.emit_subtree(node);
            }
        }
        let pending = self.emit_changed(&ctx, &before, &reset);

        let mut targets = Vec::new();
        self.root.reset_targets(&affected, &mut Vec::new(), true, &mut targets);
        let runs = targets
            .into_iter()
            .filter(|(_, reachable, _)| *reachable)
            .map(|(_, _, node)| node.execute(&ctx));
        futures::future::join_all(runs).await;

        self.emit_changed(&ctx, &pending, &reset);
        affected
    }

    /// Emit every node outside `skip` whose status differs from `before`
    ///
    /// Returns the current statuses.
    fn emit_changed(
        &self,
        ctx: &RunContext,
        before: &IndexMap<String, RunStatus>,
        skip: &IndexSet<String>,
    ) -> IndexMap<String, RunStatus> {
        let now = self.statuses();
        for (node_name, status) in &now {
            if skip.contains(node_name) || before.get(node_name) == Some(status) {
                continue;
            }
            if let Some(node) = self.root.find(node_name) {
                ctx.emit(node);
            }
        }
        now
    }

    /// Root status
    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.root.status()
    }

    /// Status of every node, parents first
    #[must_use]
    pub fn statuses(&self) -> IndexMap<String, RunStatus> {
        let mut statuses = IndexMap::new();
        self.root.walk(&mut |node| {
            statuses.insert(node.name().to_string(), node.status());
        });
        statuses
    }

    /// Node by qualified name
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&RunNode> {
        self.root.find(name)
    }

    /// Result of a node's query
    #[must_use]
    pub fn result(&self, name: &str) -> Option<&NodeResult> {
        self.node(name)?.result()
    }

    /// Root node
    #[must_use]
    pub fn root(&self) -> &RunNode {
        &self.root
    }

    /// Number of nodes
    #[must_use]
    pub fn len(&self) -> usize {
        let mut count = 0;
        self.root.walk(&mut |_| count += 1);
        count
    }

    /// Always false; a tree has at least its root
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Run session id
    #[must_use]
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Currently bound input values
    #[must_use]
    pub fn inputs(&self) -> &IndexMap<String, Value> {
        &self.inputs
    }
}
