//! The resource value: one declared entity of a mod.
//!
//! Resources arrive from the declarative-source parser already resolved to
//! names. Every kind shares this shape; the fields a kind does not use stay
//! empty.

use crate::kind::ResourceKind;
use crate::name::QualifiedName;
use crate::reference::ResourceReference;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Value bound to a query argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgValue {
    /// Fixed value
    Literal(Value),
    /// Current value of the named input (unqualified name)
    Input(String),
}

/// A declared resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Qualified name; also determines the kind and owning mod
    pub name: QualifiedName,
    /// Display title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Inline SQL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    /// Named query to run instead of inline SQL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<QualifiedName>,
    /// Query arguments by parameter name
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub args: IndexMap<String, ArgValue>,
    /// Structurally nested resources, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<QualifiedName>,
    /// Owning dashboard (inputs only); `None` means global
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard: Option<QualifiedName>,
    /// Remaining kind-specific attributes
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Value>,
    /// References held by this resource
    #[serde(default, skip_serializing_if = "IndexSet::is_empty")]
    pub references: IndexSet<ResourceReference>,
}

impl Resource {
    /// Create an empty resource with the given name
    #[must_use]
    pub fn new(name: QualifiedName) -> Self {
        Self {
            name,
            title: None,
            sql: None,
            query: None,
            args: IndexMap::new(),
            children: Vec::new(),
            dashboard: None,
            properties: BTreeMap::new(),
            references: IndexSet::new(),
        }
    }

    /// Resource kind
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.name.kind()
    }

    /// Owning mod
    #[must_use]
    pub fn mod_name(&self) -> &str {
        self.name.mod_name()
    }

    /// Unqualified name
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.name.short_name()
    }

    /// Whether executing this resource dispatches a query
    #[must_use]
    pub fn has_query(&self) -> bool {
        self.kind().is_query_provider() && (self.sql.is_some() || self.query.is_some())
    }

    /// Unqualified names of every input this resource reads
    ///
    /// Collected from input-bound arguments and from references that
    /// target an input.
    #[must_use]
    pub fn input_dependencies(&self) -> IndexSet<String> {
        let from_args = self.args.values().filter_map(|arg| match arg {
            ArgValue::Input(name) => Some(name.clone()),
            ArgValue::Literal(_) => None,
        });
        let from_refs = self
            .references
            .iter()
            .filter_map(ResourceReference::target)
            .filter(|target| target.kind() == ResourceKind::Input)
            .map(|target| target.short_name().to_string());
        from_args.chain(from_refs).collect()
    }

    /// Set title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set inline SQL
    #[must_use]
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }

    /// Run a named query; also records the reference
    #[must_use]
    pub fn with_query(mut self, query: QualifiedName) -> Self {
        let reference = ResourceReference::new(self.name.clone(), query.to_string()).with_attribute("query");
        self.references.insert(reference);
        self.query = Some(query);
        self
    }

    /// Bind an argument
    #[must_use]
    pub fn with_arg(mut self, name: impl Into<String>, value: ArgValue) -> Self {
        self.args.insert(name.into(), value);
        self
    }

    /// Bind an argument to an input of the same mod; also records the reference
    #[must_use]
    pub fn with_input_arg(mut self, name: impl Into<String>, input: &str) -> Self {
        let target = format!("{}.{}.{}", self.mod_name(), ResourceKind::Input, input);
        self.references
            .insert(ResourceReference::new(self.name.clone(), target).with_attribute("args"));
        self.with_arg(name, ArgValue::Input(input.to_string()))
    }

    /// Nest a child resource
    #[must_use]
    pub fn with_child(mut self, child: QualifiedName) -> Self {
        self.children.push(child);
        self
    }

    /// Scope an input to a dashboard
    #[must_use]
    pub fn with_dashboard(mut self, dashboard: QualifiedName) -> Self {
        self.dashboard = Some(dashboard);
        self
    }

    /// Set a kind-specific attribute
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Record a reference to another resource
    #[must_use]
    pub fn with_reference(mut self, to: impl Into<String>) -> Self {
        self.references.insert(ResourceReference::new(self.name.clone(), to));
        self
    }
}
