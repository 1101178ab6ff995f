//! Workspace loading.
//!
//! A workspace file lists mods with their resources already parsed:
//!
//! ```json
//! { "mods": [ { "name": "app", "dependencies": ["lib"], "resources": [ ... ] } ] }
//! ```
//!
//! Loading builds one catalog per mod, merges the root mod's catalog with
//! the catalogs of its transitive dependencies, and indexes references.

use crate::catalog::{Catalog, ModInfo};
use crate::diagnostic::Diagnostics;
use beacon_core::Resource;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parsed workspace file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceFile {
    /// Mods in declaration order
    pub mods: Vec<ModSource>,
}

/// One mod and its resources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModSource {
    /// Mod metadata
    #[serde(flatten)]
    pub info: ModInfo,
    /// Declared resources
    #[serde(default)]
    pub resources: Vec<Resource>,
}

/// Workspace load errors
#[derive(Debug, Error)]
pub enum LoadError {
    /// Malformed workspace file
    #[error("Invalid workspace file: {0}")]
    Json(#[from] serde_json::Error),

    /// Requested root mod is not declared
    #[error("Unknown mod: {0}")]
    UnknownMod(String),

    /// Workspace declares no mods
    #[error("Workspace declares no mods")]
    Empty,

    /// A dependency is not declared in the workspace
    #[error("Mod '{mod_name}' depends on '{dependency}', which is not in the workspace")]
    MissingDependency {
        /// Depending mod
        mod_name: String,
        /// Missing dependency
        dependency: String,
    },

    /// Mods depend on each other in a loop
    #[error("Dependency cycle: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),
}

/// Merged catalog plus every diagnostic raised while building it
#[derive(Debug, Clone)]
pub struct LoadedWorkspace {
    /// Root mod catalog merged with its dependencies, references populated
    pub catalog: Catalog,
    /// Duplicate, conflict and unresolved-reference diagnostics
    pub diagnostics: Diagnostics,
}

impl WorkspaceFile {
    /// Parse from JSON text
    ///
    /// # Errors
    ///
    /// Returns `LoadError::Json` on malformed input
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build the merged catalog rooted at `root`, or at the first mod
    ///
    /// # Errors
    ///
    /// Returns an error if the root or a dependency is missing, or the
    /// dependency graph has a cycle. Resource-level problems are reported
    /// as diagnostics instead.
    pub fn load(&self, root: Option<&str>) -> Result<LoadedWorkspace, LoadError> {
        let root_name = match root {
            Some(name) => name.to_string(),
            None => self.mods.first().map(|m| m.info.name.clone()).ok_or(LoadError::Empty)?,
        };

        let sources: IndexMap<&str, &ModSource> =
            self.mods.iter().map(|source| (source.info.name.as_str(), source)).collect();
        if !sources.contains_key(root_name.as_str()) {
            return Err(LoadError::UnknownMod(root_name));
        }

        let mut order = IndexSet::new();
        let mut stack = Vec::new();
        visit_dependencies(&root_name, &sources, &mut stack, &mut order)?;

        let mut diagnostics = Diagnostics::new();
        let mut catalogs = order.iter().map(|name| {
            let source = sources[name.as_str()];
            let mut catalog = Catalog::new(source.info.clone());
            for resource in &source.resources {
                diagnostics.extend(catalog.add_resource(resource.clone()));
            }
            catalog
        });

        // `order` starts with the root
        let root_catalog = catalogs.next().ok_or_else(|| LoadError::UnknownMod(root_name.clone()))?;
        let dependencies: Vec<Catalog> = catalogs.collect();

        let merged = root_catalog.merge(&dependencies);
        diagnostics.extend(merged.diagnostics);

        let mut catalog = merged.catalog;
        catalog.populate_references();
        diagnostics.extend(catalog.validate_references());

        tracing::info!(
            root = %root_name,
            mods = order.len(),
            resources = catalog.len(),
            diagnostics = diagnostics.len(),
            "workspace loaded"
        );

        Ok(LoadedWorkspace { catalog, diagnostics })
    }
}

/// Parse a workspace file and build the merged catalog
///
/// # Errors
///
/// See `WorkspaceFile::load`
pub fn load_workspace(json: &str, root: Option<&str>) -> Result<LoadedWorkspace, LoadError> {
    WorkspaceFile::from_json(json)?.load(root)
}

/// Depth-first preorder over the dependency graph
fn visit_dependencies(
    name: &str,
    sources: &IndexMap<&str, &ModSource>,
    stack: &mut Vec<String>,
    order: &mut IndexSet<String>,
) -> Result<(), LoadError> {
    if let Some(pos) = stack.iter().position(|entry| entry == name) {
        let mut cycle = stack[pos..].to_vec();
        cycle.push(name.to_string());
        return Err(LoadError::DependencyCycle(cycle));
    }
    if order.contains(name) {
        return Ok(());
    }

    order.insert(name.to_string());
    stack.push(name.to_string());
    let source = sources[name];
    for dependency in &source.info.dependencies {
        if !sources.contains_key(dependency.as_str()) {
            return Err(LoadError::MissingDependency {
                mod_name: name.to_string(),
                dependency: dependency.clone(),
            });
        }
        visit_dependencies(dependency, sources, stack, order)?;
    }
    stack.pop();
    Ok(())
}
