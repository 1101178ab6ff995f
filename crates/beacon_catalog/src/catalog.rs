//! Per-mod typed resource storage.
//!
//! All kinds live in one map keyed by kind, each holding an insertion-ordered
//! map from catalog key to resource. The catalog key is the qualified name
//! for every kind except Variables, which are keyed by unqualified name.
//! Inputs owned by a dashboard are held apart from global inputs.

use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::reference::ReferenceIndex;
use beacon_core::{QualifiedName, Resource, ResourceKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Entries of one kind, keyed by catalog key
pub(crate) type KindMap = IndexMap<String, Arc<Resource>>;

/// A mod known to the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModInfo {
    /// Mod name (first segment of every qualified name it declares)
    pub name: String,
    /// Display title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Names of the mods this mod depends on, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

impl ModInfo {
    /// Create a mod with no dependencies
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: None,
            dependencies: Vec::new(),
        }
    }

    /// Add a dependency
    #[must_use]
    pub fn with_dependency(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    /// Set title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Typed resource catalog of one mod, optionally merged with its dependencies
#[derive(Debug, Clone)]
pub struct Catalog {
    /// The mod this catalog was built for
    pub(crate) root: ModInfo,
    /// Every mod whose resources are present, root first
    pub(crate) mods: IndexMap<String, ModInfo>,
    /// Kind -> catalog key -> resource; global inputs live under `Input`
    pub(crate) resources: BTreeMap<ResourceKind, KindMap>,
    /// Dashboard name -> input name -> input
    pub(crate) dashboard_inputs: IndexMap<String, KindMap>,
    /// Query/Control/Benchmark declared by the root mod, keyed by unqualified name
    pub(crate) local: BTreeMap<ResourceKind, KindMap>,
    /// Reference text -> reference; empty until `populate_references`
    pub(crate) references: ReferenceIndex,
}

impl Catalog {
    /// Create an empty catalog for a mod
    #[must_use]
    pub fn new(root: ModInfo) -> Self {
        let mut mods = IndexMap::new();
        mods.insert(root.name.clone(), root.clone());
        Self {
            root,
            mods,
            resources: BTreeMap::new(),
            dashboard_inputs: IndexMap::new(),
            local: BTreeMap::new(),
            references: ReferenceIndex::default(),
        }
    }

    /// Build a reduced catalog holding only the queries and controls among `providers`
    ///
    /// Used to compile just the queries that are about to run.
    #[must_use]
    pub fn for_query_providers<I>(root: ModInfo, providers: I) -> Self
    where
        I: IntoIterator<Item = Arc<Resource>>,
    {
        let mut catalog = Self::new(root);
        for provider in providers {
            if matches!(provider.kind(), ResourceKind::Query | ResourceKind::Control) {
                catalog
                    .resources
                    .entry(provider.kind())
                    .or_default()
                    .entry(provider.name.to_string())
                    .or_insert(provider);
            }
        }
        catalog
    }

    /// Insert a resource
    ///
    /// An existing entry under the same key is kept and a duplicate
    /// diagnostic is returned instead.
    pub fn add_resource(&mut self, resource: Resource) -> Diagnostics {
        let resource = Arc::new(resource);
        let kind = resource.kind();

        if kind == ResourceKind::Input {
            if let Some(dashboard) = &resource.dashboard {
                let inputs = self.dashboard_inputs.entry(dashboard.to_string()).or_default();
                return insert_unique(inputs, resource.name.to_string(), resource);
            }
        }

        let key = catalog_key(&resource);
        let entries = self.resources.entry(kind).or_default();
        let diagnostics = insert_unique(entries, key, Arc::clone(&resource));
        if diagnostics.is_empty() && kind.mirrors_locally() {
            self.local
                .entry(kind)
                .or_default()
                .insert(resource.short_name().to_string(), resource);
        }
        diagnostics
    }

    /// Every resource able to produce query results
    ///
    /// Order: queries, controls, cards, charts, flows, hierarchies,
    /// dashboard inputs, global inputs, tables; insertion order within each.
    #[must_use]
    pub fn query_providers(&self) -> Vec<Arc<Resource>> {
        use ResourceKind::{Card, Chart, Control, Flow, Hierarchy, Input, Query, Table};

        let mut providers: Vec<Arc<Resource>> = Vec::new();
        for kind in [Query, Control, Card, Chart, Flow, Hierarchy] {
            providers.extend(self.of_kind(kind).cloned());
        }
        providers.extend(self.dashboard_inputs.values().flat_map(|inputs| inputs.values().cloned()));
        providers.extend(self.of_kind(Input).cloned());
        providers.extend(self.of_kind(Table).cloned());
        providers
    }

    /// Visit every resource once, in walk order
    ///
    /// Walk order is kind order, with global inputs before dashboard inputs.
    /// The walk stops as soon as `visit` returns `Ok(false)` or an error; the
    /// error is returned.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `visit`
    pub fn walk_resources<E, F>(&self, mut visit: F) -> Result<(), E>
    where
        F: FnMut(&Arc<Resource>) -> Result<bool, E>,
    {
        for resource in self.iter() {
            if !visit(resource)? {
                break;
            }
        }
        Ok(())
    }

    /// Iterate every resource in walk order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Resource>> + '_ {
        ResourceKind::ALL.into_iter().flat_map(move |kind| self.walk_kind(kind))
    }

    fn walk_kind(&self, kind: ResourceKind) -> Box<dyn Iterator<Item = &Arc<Resource>> + '_> {
        let own = self.of_kind(kind);
        if kind == ResourceKind::Input {
            Box::new(own.chain(self.dashboard_inputs.values().flat_map(|inputs| inputs.values())))
        } else {
            Box::new(own)
        }
    }

    /// Resources of one kind in insertion order (global inputs only for `Input`)
    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &Arc<Resource>> + '_ {
        self.resources.get(&kind).into_iter().flat_map(|entries| entries.values())
    }

    /// Whether every kind-specific mapping is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.values().all(IndexMap::is_empty)
            && self.dashboard_inputs.values().all(IndexMap::is_empty)
    }

    /// Total number of resources
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.values().map(IndexMap::len).sum::<usize>()
            + self.dashboard_inputs.values().map(IndexMap::len).sum::<usize>()
    }

    /// Number of resources of one kind, dashboard inputs included for `Input`
    #[must_use]
    pub fn count(&self, kind: ResourceKind) -> usize {
        let own = self.resources.get(&kind).map_or(0, IndexMap::len);
        if kind == ResourceKind::Input {
            own + self.dashboard_inputs.values().map(IndexMap::len).sum::<usize>()
        } else {
            own
        }
    }

    /// Look up a resource by qualified name
    ///
    /// Variables are found by their unqualified name; inputs are searched in
    /// the global scope only (see `dashboard_input`).
    #[must_use]
    pub fn get(&self, name: &QualifiedName) -> Option<&Arc<Resource>> {
        let key = match name.kind() {
            ResourceKind::Variable => name.short_name().to_string(),
            _ => name.to_string(),
        };
        self.resources.get(&name.kind())?.get(&key)
    }

    /// Variable by unqualified name
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&Arc<Resource>> {
        self.resources.get(&ResourceKind::Variable)?.get(name)
    }

    /// Global input by qualified name
    #[must_use]
    pub fn global_input(&self, input: &QualifiedName) -> Option<&Arc<Resource>> {
        self.resources.get(&ResourceKind::Input)?.get(&input.to_string())
    }

    /// Input owned by a specific dashboard
    #[must_use]
    pub fn dashboard_input(&self, dashboard: &QualifiedName, input: &QualifiedName) -> Option<&Arc<Resource>> {
        self.dashboard_inputs.get(&dashboard.to_string())?.get(&input.to_string())
    }

    /// Inputs owned by a dashboard, in declaration order
    pub fn inputs_for_dashboard(&self, dashboard: &QualifiedName) -> impl Iterator<Item = &Arc<Resource>> + '_ {
        self.dashboard_inputs
            .get(&dashboard.to_string())
            .into_iter()
            .flat_map(|inputs| inputs.values())
    }

    /// Resolve a name as seen from inside `dashboard`
    ///
    /// Inputs owned by the dashboard shadow global inputs of the same name.
    #[must_use]
    pub fn get_in_dashboard(&self, dashboard: &QualifiedName, name: &QualifiedName) -> Option<&Arc<Resource>> {
        if name.kind() == ResourceKind::Input {
            self.dashboard_input(dashboard, name).or_else(|| self.global_input(name))
        } else {
            self.get(name)
        }
    }

    /// Resolve reference text in any scope
    #[must_use]
    pub fn resolve(&self, text: &str) -> Option<&Arc<Resource>> {
        let name: QualifiedName = text.parse().ok()?;
        if name.kind() == ResourceKind::Input {
            let key = name.to_string();
            return self
                .global_input(&name)
                .or_else(|| self.dashboard_inputs.values().find_map(|inputs| inputs.get(&key)));
        }
        self.get(&name)
    }

    /// Query, Control or Benchmark declared by the root mod, by unqualified name
    #[must_use]
    pub fn local(&self, kind: ResourceKind, short_name: &str) -> Option<&Arc<Resource>> {
        self.local.get(&kind)?.get(short_name)
    }

    /// The mod this catalog belongs to
    #[must_use]
    pub fn root_mod(&self) -> &ModInfo {
        &self.root
    }

    /// Every mod present, root first
    pub fn mods(&self) -> impl Iterator<Item = &ModInfo> + '_ {
        self.mods.values()
    }

    /// Reference index (empty until `populate_references` runs)
    #[must_use]
    pub fn references(&self) -> &ReferenceIndex {
        &self.references
    }
}

/// Key a resource is stored under in its kind map
pub(crate) fn catalog_key(resource: &Resource) -> String {
    match resource.kind() {
        ResourceKind::Variable => resource.short_name().to_string(),
        _ => resource.name.to_string(),
    }
}

fn insert_unique(entries: &mut KindMap, key: String, resource: Arc<Resource>) -> Diagnostics {
    if let Some(existing) = entries.get(&key) {
        tracing::debug!(resource = %resource.name, "duplicate resource rejected");
        return Diagnostic::duplicate(existing, &resource).into();
    }
    entries.insert(key, resource);
    Diagnostics::new()
}
