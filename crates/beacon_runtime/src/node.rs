//! Run nodes.
//!
//! A run node is the execution-time instance of one resource inside a
//! dashboard run. Each node owns its status, error and children; nothing
//! else writes them. Children execute as tasks in a `JoinSet` owned by
//! their parent, which is the only place a node waits.

use crate::backend::{QueryBackend, QueryRequest, RowSet};
use crate::config::SchedulerConfig;
use crate::error::NodeError;
use beacon_catalog::Catalog;
use beacon_core::{ArgValue, QualifiedName, Resource, ResourceKind, ResultId, RunId};
use beacon_log::{EventSink, NodeEvent, RunStatus};
use futures::future::{BoxFuture, FutureExt};
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Rows produced by a node's query
#[derive(Debug, Clone, PartialEq)]
pub struct NodeResult {
    /// Opaque handle reported to the presentation layer
    pub id: ResultId,
    /// The rows themselves
    pub rows: Arc<RowSet>,
}

/// Everything a node needs while executing
#[derive(Clone)]
pub struct RunContext {
    /// Run session
    pub run_id: RunId,
    /// Where queries go
    pub backend: Arc<dyn QueryBackend>,
    /// Where status transitions go
    pub sink: Arc<dyn EventSink>,
    /// Bound input values by unqualified input name
    pub inputs: Arc<IndexMap<String, Value>>,
    /// Scheduler settings
    pub config: SchedulerConfig,
}

impl RunContext {
    /// Report a node's current status
    pub fn emit(&self, node: &RunNode) {
        self.emit_event(node.event(self.run_id));
    }

    /// Report the status of every node in a subtree, parents first
    pub fn emit_subtree(&self, node: &RunNode) {
        if !self.config.emit_events {
            return;
        }
        node.walk(&mut |n| self.emit(n));
    }

    fn emit_event(&self, event: NodeEvent) {
        if self.config.emit_events {
            self.sink.emit(event);
        }
    }
}

/// Execution-time instance of a resource
#[derive(Debug, Clone)]
pub struct RunNode {
    resource: Arc<Resource>,
    name: String,
    /// Pre-run status set by `initialise`: `Blocked` or `Ready`
    status: RunStatus,
    error: Option<NodeError>,
    run_complete: bool,
    children: Vec<RunNode>,
    /// Unqualified names of the inputs this node reads, captured at initialise
    input_deps: IndexSet<String>,
    sql: Option<String>,
    result: Option<NodeResult>,
}

impl RunNode {
    /// Create an uninitialised node
    #[must_use]
    pub fn new(resource: Arc<Resource>) -> Self {
        Self {
            name: resource.name.to_string(),
            resource,
            status: RunStatus::Blocked,
            error: None,
            run_complete: false,
            children: Vec::new(),
            input_deps: IndexSet::new(),
            sql: None,
            result: None,
        }
    }

    fn panicked(resource: Arc<Resource>) -> Self {
        let mut node = Self::new(resource);
        node.error = Some(NodeError::TaskPanicked(node.name.clone()));
        node
    }

    /// Build children from the resource's nesting and compute the pre-run status
    ///
    /// Children are resolved inside `dashboard`, so inputs it owns shadow
    /// global inputs. Any previous run state is discarded.
    pub fn initialise(&mut self, catalog: &Catalog, dashboard: &QualifiedName, inputs: &IndexMap<String, Value>) {
        self.initialise_within(catalog, dashboard, inputs, &mut Vec::new());
    }

    /// `initialise` for a node whose ancestors are already known
    pub(crate) fn reinitialise(
        &mut self,
        catalog: &Catalog,
        dashboard: &QualifiedName,
        inputs: &IndexMap<String, Value>,
        ancestors: &[String],
    ) {
        self.initialise_within(catalog, dashboard, inputs, &mut ancestors.to_vec());
    }

    fn initialise_within(
        &mut self,
        catalog: &Catalog,
        dashboard: &QualifiedName,
        inputs: &IndexMap<String, Value>,
        ancestors: &mut Vec<String>,
    ) {
        self.error = None;
        self.run_complete = false;
        self.result = None;
        self.children.clear();
        self.input_deps = self.resource.input_dependencies();
        self.sql = match self.resolve_sql(catalog) {
            Ok(sql) => sql,
            Err(err) => {
                self.set_error(err);
                None
            }
        };

        let resource = Arc::clone(&self.resource);
        ancestors.push(self.name.clone());
        for child_name in &resource.children {
            let Some(child_resource) = catalog.get_in_dashboard(dashboard, child_name) else {
                self.set_error(NodeError::UnresolvedChild(child_name.to_string()));
                continue;
            };

            let mut child = RunNode::new(Arc::clone(child_resource));
            if let Some(start) = ancestors.iter().position(|ancestor| *ancestor == child.name) {
                let mut path = ancestors[start..].to_vec();
                path.push(child.name.clone());
                child.set_error(NodeError::Cycle(path));
            } else {
                child.initialise_within(catalog, dashboard, inputs, ancestors);
            }
            self.children.push(child);
        }
        ancestors.pop();

        let missing = self.input_deps.iter().find(|input| !inputs.contains_key(*input));
        self.status = if missing.is_some() {
            RunStatus::Blocked
        } else {
            RunStatus::Ready
        };
        tracing::trace!(node = %self.name, status = %self.status, children = self.children.len(), "initialised");
    }

    fn resolve_sql(&self, catalog: &Catalog) -> Result<Option<String>, NodeError> {
        if !self.resource.has_query() {
            return Ok(None);
        }
        if let Some(sql) = &self.resource.sql {
            return Ok(Some(sql.clone()));
        }
        match &self.resource.query {
            None => Ok(None),
            Some(query) => catalog
                .get(query)
                .and_then(|resolved| resolved.sql.clone())
                .map(Some)
                .ok_or_else(|| NodeError::UnresolvedQuery(query.to_string())),
        }
    }

    fn request(&self, inputs: &IndexMap<String, Value>) -> Result<Option<QueryRequest>, NodeError> {
        let Some(sql) = &self.sql else {
            return Ok(None);
        };

        let mut args = IndexMap::with_capacity(self.resource.args.len());
        for (param, arg) in &self.resource.args {
            let value = match arg {
                ArgValue::Literal(value) => value.clone(),
                ArgValue::Input(input) => inputs
                    .get(input)
                    .cloned()
                    .ok_or_else(|| NodeError::MissingInput(input.clone()))?,
            };
            args.insert(param.clone(), value);
        }

        Ok(Some(QueryRequest {
            node: self.resource.name.clone(),
            sql: sql.clone(),
            args,
        }))
    }

    /// Run this node and its ready children
    ///
    /// Does nothing unless the node is `Ready`. The node's query and its
    /// children run concurrently. Once a child fails no further children
    /// are started; children already running are left to finish.
    pub fn execute<'a>(&'a mut self, ctx: &'a RunContext) -> BoxFuture<'a, ()> {
        async move {
            if self.status() != RunStatus::Ready {
                tracing::debug!(node = %self.name, status = %self.status(), "not runnable");
                return;
            }
            tracing::debug!(node = %self.name, children = self.children.len(), "dispatching");

            let query = match self.request(&ctx.inputs) {
                Ok(Some(request)) => {
                    let backend = Arc::clone(&ctx.backend);
                    Some(tokio::spawn(async move { backend.execute(request).await }))
                }
                Ok(None) => {
                    self.set_complete();
                    None
                }
                Err(err) => {
                    self.set_error(err);
                    ctx.emit(self);
                    return;
                }
            };

            let failure_reported = self.run_children(ctx).await;

            if let Some(handle) = query {
                match handle.await {
                    Ok(Ok(rows)) => {
                        self.result = Some(NodeResult {
                            id: ResultId::new(),
                            rows: Arc::new(rows),
                        });
                        self.set_complete();
                    }
                    Ok(Err(err)) => self.set_error(err.into()),
                    Err(err) => {
                        tracing::error!(node = %self.name, error = %err, "query task failed");
                        self.set_error(NodeError::TaskPanicked(self.name.clone()));
                    }
                }
            }

            let status = self.status();
            if status.is_terminal() && !(failure_reported && status == RunStatus::Error) {
                ctx.emit(self);
            }
            tracing::debug!(node = %self.name, status = %status, "finished");
        }
        .boxed()
    }

    /// Returns whether this node's failure has already been reported
    async fn run_children(&mut self, ctx: &RunContext) -> bool {
        let children = std::mem::take(&mut self.children);
        let resources: Vec<Arc<Resource>> = children.iter().map(|child| Arc::clone(&child.resource)).collect();
        let mut queue: VecDeque<usize> = children
            .iter()
            .enumerate()
            .filter(|(_, child)| child.status() == RunStatus::Ready)
            .map(|(index, _)| index)
            .collect();
        let mut slots: Vec<Option<RunNode>> = children.into_iter().map(Some).collect();

        let limit = ctx.config.child_limit();
        let mut tasks = JoinSet::new();
        let mut failed = false;
        let mut reported = false;

        loop {
            while !failed && tasks.len() < limit {
                let Some(index) = queue.pop_front() else {
                    break;
                };
                let Some(mut child) = slots[index].take() else {
                    continue;
                };
                let child_ctx = ctx.clone();
                let resource = Arc::clone(&resources[index]);
                tasks.spawn(async move {
                    let outcome = AssertUnwindSafe(child.execute(&child_ctx)).catch_unwind().await;
                    let node = match outcome {
                        Ok(()) => child,
                        Err(_) => {
                            let node = RunNode::panicked(resource);
                            tracing::error!(node = %node.name, "node task panicked");
                            child_ctx.emit(&node);
                            node
                        }
                    };
                    (index, node)
                });
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };
            match joined {
                Ok((index, child)) => {
                    if child.status() == RunStatus::Error && !failed {
                        tracing::warn!(node = %self.name, child = %child.name, "child failed, no further children started");
                        failed = true;
                    }
                    slots[index] = Some(child);
                }
                Err(err) => {
                    tracing::error!(node = %self.name, error = %err, "child task lost");
                    failed = true;
                }
            }

            if failed && !reported {
                let event = NodeEvent::new(ctx.run_id, self.name.clone(), RunStatus::Error)
                    .with_error("a child node failed");
                ctx.emit_event(event);
                reported = true;
            }
        }

        self.children = slots
            .into_iter()
            .zip(resources)
            .map(|(slot, resource)| slot.unwrap_or_else(|| RunNode::panicked(resource)))
            .collect();
        reported
    }

    /// Record a terminal failure; the first error recorded is kept
    pub fn set_error(&mut self, err: NodeError) {
        tracing::warn!(node = %self.name, error = %err, "node failed");
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    /// Recorded failure, if any
    #[must_use]
    pub fn error(&self) -> Option<&NodeError> {
        self.error.as_ref()
    }

    /// Mark the node's own work as finished
    pub fn set_complete(&mut self) {
        self.run_complete = true;
    }

    /// Whether the node's own work finished successfully
    #[must_use]
    pub fn run_complete(&self) -> bool {
        self.run_complete
    }

    /// Whether every direct child is `Complete`
    #[must_use]
    pub fn children_complete(&self) -> bool {
        self.children.iter().all(|child| child.status() == RunStatus::Complete)
    }

    /// Externally observed status
    #[must_use]
    pub fn status(&self) -> RunStatus {
        if self.error.is_some() {
            return RunStatus::Error;
        }
        let mut children_complete = true;
        for child in &self.children {
            match child.status() {
                RunStatus::Error => return RunStatus::Error,
                RunStatus::Complete => {}
                _ => children_complete = false,
            }
        }
        if self.run_complete && children_complete {
            RunStatus::Complete
        } else {
            self.status
        }
    }

    /// Every node in this subtree that transitively depends on `changed_input`
    ///
    /// Computed from the input dependencies captured at initialise. An input
    /// node that depends on the changed input counts as changed itself, so
    /// its own dependents are included.
    #[must_use]
    pub fn inputs_depending_on(&self, changed_input: &str) -> IndexSet<String> {
        let mut changed = IndexSet::from([changed_input.to_string()]);
        let mut affected = IndexSet::new();
        loop {
            let seen = (changed.len(), affected.len());
            self.collect_dependents(&mut changed, &mut affected);
            if (changed.len(), affected.len()) == seen {
                return affected;
            }
        }
    }

    fn collect_dependents(&self, changed: &mut IndexSet<String>, affected: &mut IndexSet<String>) {
        if self.input_deps.iter().any(|input| changed.contains(input)) {
            affected.insert(self.name.clone());
            if self.resource.kind() == ResourceKind::Input {
                changed.insert(self.resource.short_name().to_string());
            }
        }
        for child in &self.children {
            child.collect_dependents(changed, affected);
        }
    }

    /// Topmost affected nodes, with their ancestor path and whether every
    /// ancestor finished its own work
    pub(crate) fn reset_targets<'a>(
        &'a mut self,
        affected: &IndexSet<String>,
        ancestors: &mut Vec<String>,
        reachable: bool,
        out: &mut Vec<(Vec<String>, bool, &'a mut RunNode)>,
    ) {
        if affected.contains(&self.name) {
            out.push((ancestors.clone(), reachable, self));
            return;
        }
        let reachable = reachable && self.run_complete;
        ancestors.push(self.name.clone());
        for child in &mut self.children {
            child.reset_targets(affected, ancestors, reachable, out);
        }
        ancestors.pop();
    }

    /// Status event for this node
    #[must_use]
    pub fn event(&self, run_id: RunId) -> NodeEvent {
        let status = self.status();
        let mut event = NodeEvent::new(run_id, self.name.clone(), status);
        if status == RunStatus::Error {
            if let Some(message) = self.failure_message() {
                event = event.with_error(message);
            }
        }
        if let Some(result) = &self.result {
            event = event.with_result(result.id);
        }
        event
    }

    fn failure_message(&self) -> Option<String> {
        if let Some(err) = &self.error {
            return Some(err.to_string());
        }
        self.children.iter().find_map(|child| match child.status() {
            RunStatus::Error => Some(format!("child {} failed", child.name)),
            _ => None,
        })
    }

    /// Visit this node and its descendants, parents first
    pub fn walk(&self, visit: &mut dyn FnMut(&RunNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Find a node in this subtree by qualified name
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&RunNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    /// Qualified name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resource this node runs
    #[must_use]
    pub fn resource(&self) -> &Arc<Resource> {
        &self.resource
    }

    /// Direct children in declaration order
    #[must_use]
    pub fn children(&self) -> &[RunNode] {
        &self.children
    }

    /// Query result, once the query has succeeded
    #[must_use]
    pub fn result(&self) -> Option<&NodeResult> {
        self.result.as_ref()
    }

    /// Inputs this node reads
    #[must_use]
    pub fn input_dependencies(&self) -> &IndexSet<String> {
        &self.input_deps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use beacon_catalog::ModInfo;
    use beacon_log::{event_channel, NullSink};
    use serde_json::json;

    fn name(text: &str) -> QualifiedName {
        text.parse().unwrap()
    }

    fn rows() -> RowSet {
        RowSet::new(vec!["n".into()], vec![vec![json!(1)]])
    }

    fn context(backend: Arc<MemoryBackend>, sink: Arc<dyn EventSink>) -> RunContext {
        RunContext {
            run_id: RunId::new(),
            backend,
            sink,
            inputs: Arc::new(IndexMap::new()),
            config: SchedulerConfig::default(),
        }
    }

    fn catalog(resources: Vec<Resource>) -> Catalog {
        let mut catalog = Catalog::new(ModInfo::new("demo"));
        for resource in resources {
            catalog.add_resource(resource);
        }
        catalog
    }

    fn root(catalog: &Catalog, inputs: &IndexMap<String, Value>) -> RunNode {
        let dashboard = name("demo.dashboard.d");
        let mut node = RunNode::new(Arc::clone(catalog.get(&dashboard).unwrap()));
        node.initialise(catalog, &dashboard, inputs);
        node
    }

    #[test]
    fn test_initialise_builds_children() {
        let catalog = catalog(vec![
            Resource::new(name("demo.dashboard.d"))
                .with_child(name("demo.container.box"))
                .with_child(name("demo.text.title")),
            Resource::new(name("demo.container.box")).with_child(name("demo.chart.c")),
            Resource::new(name("demo.chart.c")).with_sql("select 1"),
            Resource::new(name("demo.text.title")),
        ]);
        let node = root(&catalog, &IndexMap::new());

        assert_eq!(node.status(), RunStatus::Ready);
        assert_eq!(node.children().len(), 2);
        assert_eq!(node.children()[0].children()[0].name(), "demo.chart.c");
        assert!(!node.run_complete());
        assert!(!node.children_complete());
    }

    #[test]
    fn test_initialise_blocked_on_missing_input() {
        let catalog = catalog(vec![
            Resource::new(name("demo.dashboard.d")).with_child(name("demo.chart.c")),
            Resource::new(name("demo.chart.c"))
                .with_sql("select $1")
                .with_input_arg("region", "region"),
        ]);

        let node = root(&catalog, &IndexMap::new());
        assert_eq!(node.children()[0].status(), RunStatus::Blocked);
        assert_eq!(node.status(), RunStatus::Ready);

        let inputs = IndexMap::from([("region".to_string(), json!("eu"))]);
        let node = root(&catalog, &inputs);
        assert_eq!(node.children()[0].status(), RunStatus::Ready);
    }

    #[test]
    fn test_initialise_unresolved_child_and_query() {
        let catalog = catalog(vec![
            Resource::new(name("demo.dashboard.d"))
                .with_child(name("demo.chart.missing"))
                .with_child(name("demo.card.k")),
            Resource::new(name("demo.card.k")).with_query(name("demo.query.gone")),
        ]);
        let node = root(&catalog, &IndexMap::new());

        assert_eq!(
            node.error(),
            Some(&NodeError::UnresolvedChild("demo.chart.missing".into()))
        );
        assert_eq!(
            node.children()[0].error(),
            Some(&NodeError::UnresolvedQuery("demo.query.gone".into()))
        );
        assert_eq!(node.status(), RunStatus::Error);
    }

    #[test]
    fn test_initialise_detects_cycle() {
        let catalog = catalog(vec![
            Resource::new(name("demo.dashboard.d")).with_child(name("demo.container.a")),
            Resource::new(name("demo.container.a")).with_child(name("demo.container.b")),
            Resource::new(name("demo.container.b")).with_child(name("demo.container.a")),
        ]);
        let node = root(&catalog, &IndexMap::new());

        let closing = &node.children()[0].children()[0].children()[0];
        assert_eq!(
            closing.error(),
            Some(&NodeError::Cycle(vec![
                "demo.container.a".into(),
                "demo.container.b".into(),
                "demo.container.a".into(),
            ]))
        );
        assert_eq!(node.status(), RunStatus::Error);
    }

    #[test]
    fn test_initialise_resolves_named_query() {
        let catalog = catalog(vec![
            Resource::new(name("demo.dashboard.d")).with_child(name("demo.card.k")),
            Resource::new(name("demo.query.q")).with_sql("select count(*) from t"),
            Resource::new(name("demo.card.k")).with_query(name("demo.query.q")),
        ]);
        let node = root(&catalog, &IndexMap::new());
        let request = node.children()[0].request(&IndexMap::new()).unwrap().unwrap();
        assert_eq!(request.sql, "select count(*) from t");
    }

    #[test]
    fn test_request_binds_args() {
        let catalog = catalog(vec![
            Resource::new(name("demo.dashboard.d")).with_child(name("demo.chart.c")),
            Resource::new(name("demo.chart.c"))
                .with_sql("select $1, $2")
                .with_input_arg("region", "region")
                .with_arg("limit", ArgValue::Literal(json!(5))),
        ]);
        let inputs = IndexMap::from([("region".to_string(), json!("eu"))]);
        let node = root(&catalog, &inputs);

        let request = node.children()[0].request(&inputs).unwrap().unwrap();
        assert_eq!(request.args["region"], json!("eu"));
        assert_eq!(request.args["limit"], json!(5));

        let err = node.children()[0].request(&IndexMap::new()).unwrap_err();
        assert_eq!(err, NodeError::MissingInput("region".into()));
    }

    #[test]
    fn test_status_rules() {
        let catalog = catalog(vec![
            Resource::new(name("demo.dashboard.d")).with_child(name("demo.text.t")),
            Resource::new(name("demo.text.t")),
        ]);
        let mut node = root(&catalog, &IndexMap::new());

        node.set_complete();
        assert!(node.run_complete());
        assert_eq!(node.status(), RunStatus::Ready);

        node.children[0].set_complete();
        assert_eq!(node.status(), RunStatus::Complete);

        node.children[0].set_error(NodeError::UnresolvedQuery("x".into()));
        node.children[0].set_error(NodeError::UnresolvedChild("y".into()));
        assert_eq!(node.status(), RunStatus::Error);
        assert_eq!(node.children[0].error(), Some(&NodeError::UnresolvedQuery("x".into())));
    }

    #[test]
    fn test_inputs_depending_on() {
        let catalog = catalog(vec![
            Resource::new(name("demo.dashboard.d"))
                .with_child(name("demo.input.region"))
                .with_child(name("demo.chart.by_region"))
                .with_child(name("demo.chart.totals")),
            Resource::new(name("demo.input.region"))
                .with_sql("select name from regions")
                .with_dashboard(name("demo.dashboard.d")),
            Resource::new(name("demo.chart.by_region"))
                .with_sql("select * from t where region = $1")
                .with_input_arg("region", "region"),
            Resource::new(name("demo.chart.totals")).with_sql("select count(*) from t"),
        ]);
        let node = root(&catalog, &IndexMap::new());

        let affected = node.inputs_depending_on("region");
        assert_eq!(affected, IndexSet::from(["demo.chart.by_region".to_string()]));
        assert!(node.inputs_depending_on("other").is_empty());
    }

    #[test]
    fn test_inputs_depending_on_is_transitive() {
        let catalog = catalog(vec![
            Resource::new(name("demo.dashboard.d"))
                .with_child(name("demo.input.account"))
                .with_child(name("demo.input.region"))
                .with_child(name("demo.table.servers")),
            Resource::new(name("demo.input.account")).with_sql("select id from accounts"),
            Resource::new(name("demo.input.region"))
                .with_sql("select region from regions where account = $1")
                .with_input_arg("account", "account"),
            Resource::new(name("demo.table.servers"))
                .with_sql("select * from servers where region = $1")
                .with_input_arg("region", "region"),
        ]);
        let node = root(&catalog, &IndexMap::new());

        let affected = node.inputs_depending_on("account");
        assert_eq!(
            affected,
            IndexSet::from(["demo.input.region".to_string(), "demo.table.servers".to_string()])
        );
    }

    #[tokio::test]
    async fn test_execute_completes() {
        let catalog = catalog(vec![
            Resource::new(name("demo.dashboard.d"))
                .with_child(name("demo.chart.a"))
                .with_child(name("demo.text.t")),
            Resource::new(name("demo.chart.a")).with_sql("select 1"),
            Resource::new(name("demo.text.t")),
        ]);
        let backend = Arc::new(MemoryBackend::new().with_result("select 1", rows()));
        let ctx = context(Arc::clone(&backend), Arc::new(NullSink));

        let mut node = root(&catalog, &IndexMap::new());
        node.execute(&ctx).await;

        assert_eq!(node.status(), RunStatus::Complete);
        assert_eq!(node.children().len(), 2);
        assert_eq!(node.children()[0].result().unwrap().rows.len(), 1);
        assert!(node.result().is_none());
        assert_eq!(backend.dispatched().len(), 1);
    }

    #[tokio::test]
    async fn test_status_on_deep_nesting() {
        let depth = 64;
        let mut resources = vec![Resource::new(name("demo.dashboard.d")).with_child(name("demo.container.c0"))];
        for i in 0..depth {
            let container = Resource::new(name(&format!("demo.container.c{i}")));
            resources.push(if i + 1 < depth {
                container.with_child(name(&format!("demo.container.c{}", i + 1)))
            } else {
                container.with_child(name("demo.chart.leaf"))
            });
        }
        resources.push(Resource::new(name("demo.chart.leaf")).with_sql("select 1"));
        let catalog = catalog(resources);
        let backend = Arc::new(MemoryBackend::new().with_result("select 1", rows()));
        let ctx = context(backend, Arc::new(NullSink));

        let mut node = root(&catalog, &IndexMap::new());
        assert_eq!(node.status(), RunStatus::Ready);
        node.execute(&ctx).await;
        assert_eq!(node.status(), RunStatus::Complete);
        assert!(node.event(ctx.run_id).error.is_none());
    }

    #[tokio::test]
    async fn test_execute_skips_sql_on_non_provider() {
        let catalog = catalog(vec![
            Resource::new(name("demo.dashboard.d"))
                .with_child(name("demo.chart.a"))
                .with_child(name("demo.text.t")),
            Resource::new(name("demo.chart.a")).with_sql("select 1"),
            Resource::new(name("demo.text.t")).with_sql("select 2"),
        ]);
        let backend = Arc::new(
            MemoryBackend::new()
                .with_result("select 1", rows())
                .with_result("select 2", rows()),
        );
        let ctx = context(Arc::clone(&backend), Arc::new(NullSink));

        let mut node = root(&catalog, &IndexMap::new());
        node.execute(&ctx).await;

        assert_eq!(node.status(), RunStatus::Complete);
        assert!(backend.was_dispatched(&name("demo.chart.a")));
        assert!(!backend.was_dispatched(&name("demo.text.t")));
        assert!(node.children()[1].result().is_none());
    }

    #[tokio::test]
    async fn test_execute_query_failure_propagates() {
        let catalog = catalog(vec![
            Resource::new(name("demo.dashboard.d")).with_child(name("demo.container.box")),
            Resource::new(name("demo.container.box")).with_child(name("demo.chart.bad")),
            Resource::new(name("demo.chart.bad")).with_sql("select boom"),
        ]);
        let backend = Arc::new(MemoryBackend::new().with_failure("select boom", "relation missing"));
        let (sink, mut stream) = event_channel();
        let ctx = context(backend, Arc::new(sink));

        let mut node = root(&catalog, &IndexMap::new());
        node.execute(&ctx).await;

        assert_eq!(node.status(), RunStatus::Error);
        let leaf = node.find("demo.chart.bad").unwrap();
        assert_eq!(
            leaf.error(),
            Some(&NodeError::QueryFailed(crate::error::QueryError::Failed("relation missing".into())))
        );

        let events = stream.drain();
        let errors: Vec<&str> = events
            .iter()
            .filter(|e| e.status == RunStatus::Error)
            .map(|e| e.node.as_str())
            .collect();
        assert_eq!(errors, vec!["demo.chart.bad", "demo.container.box", "demo.dashboard.d"]);
    }

    #[tokio::test]
    async fn test_execute_skips_blocked_children() {
        let catalog = catalog(vec![
            Resource::new(name("demo.dashboard.d")).with_child(name("demo.chart.c")),
            Resource::new(name("demo.chart.c"))
                .with_sql("select $1")
                .with_input_arg("region", "region"),
        ]);
        let backend = Arc::new(MemoryBackend::new());
        let ctx = context(Arc::clone(&backend), Arc::new(NullSink));

        let mut node = root(&catalog, &IndexMap::new());
        node.execute(&ctx).await;

        assert!(node.run_complete());
        assert_eq!(node.children()[0].status(), RunStatus::Blocked);
        assert_eq!(node.status(), RunStatus::Ready);
        assert!(backend.dispatched().is_empty());
    }

    #[tokio::test]
    async fn test_execute_not_ready_is_noop() {
        let catalog = catalog(vec![Resource::new(name("demo.dashboard.d")).with_child(name("demo.chart.gone"))]);
        let backend = Arc::new(MemoryBackend::new());
        let ctx = context(backend, Arc::new(NullSink));

        let mut node = root(&catalog, &IndexMap::new());
        node.execute(&ctx).await;
        assert!(!node.run_complete());
        assert_eq!(node.status(), RunStatus::Error);
    }
}
