//! Cross-mod merge.
//!
//! Precedence is first-declared wins: `self` first, then `others` in the
//! order given. A later declaration under an occupied key is dropped; if it
//! differs from the kept one a conflict diagnostic is reported.

use crate::catalog::{Catalog, KindMap};
use crate::diagnostic::{Diagnostic, Diagnostics};
use beacon_core::{Resource, ResourceKind};
use std::sync::Arc;

/// Result of merging catalogs
#[derive(Debug, Clone)]
pub struct MergeOutput {
    /// Merged catalog, rooted at the receiver's mod
    pub catalog: Catalog,
    /// Conflicting redeclarations found during merge
    pub diagnostics: Diagnostics,
}

impl Catalog {
    /// Merge this catalog with the catalogs of its dependencies
    ///
    /// Local mappings come from `self` only. Variables are kept only when
    /// declared by the root mod. The reference index of the result is empty;
    /// call `populate_references` once merging is done.
    #[must_use]
    pub fn merge(&self, others: &[Catalog]) -> MergeOutput {
        let mut merged = Catalog::new(self.root.clone());
        merged.local = self.local.clone();

        let mut diagnostics = Diagnostics::new();
        for source in std::iter::once(self).chain(others) {
            for (name, info) in &source.mods {
                merged.mods.entry(name.clone()).or_insert_with(|| info.clone());
            }

            for (kind, entries) in &source.resources {
                let target = merged.resources.entry(*kind).or_default();
                for (key, resource) in entries {
                    if *kind == ResourceKind::Variable && resource.mod_name() != self.root.name {
                        continue;
                    }
                    merge_entry(target, key, resource, &mut diagnostics);
                }
            }

            for (dashboard, inputs) in &source.dashboard_inputs {
                let target = merged.dashboard_inputs.entry(dashboard.clone()).or_default();
                for (key, resource) in inputs {
                    merge_entry(target, key, resource, &mut diagnostics);
                }
            }
        }

        tracing::debug!(
            root = %self.root.name,
            sources = others.len() + 1,
            resources = merged.len(),
            conflicts = diagnostics.len(),
            "catalogs merged"
        );

        MergeOutput {
            catalog: merged,
            diagnostics,
        }
    }
}

fn merge_entry(target: &mut KindMap, key: &str, resource: &Arc<Resource>, diagnostics: &mut Diagnostics) {
    match target.get(key) {
        None => {
            target.insert(key.to_string(), Arc::clone(resource));
        }
        Some(kept) if Arc::ptr_eq(kept, resource) || **kept == **resource => {}
        Some(kept) => {
            tracing::warn!(
                resource = %resource.name,
                kept_from = %kept.mod_name(),
                "conflicting redeclaration ignored"
            );
            diagnostics.push(Diagnostic::conflicting(kept, resource));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ModInfo;
    use crate::diagnostic::DiagnosticKind;
    use beacon_core::QualifiedName;
    use proptest::prelude::*;

    fn name(text: &str) -> QualifiedName {
        text.parse().unwrap()
    }

    fn catalog_of(mod_name: &str, resources: Vec<Resource>) -> Catalog {
        let mut catalog = Catalog::new(ModInfo::new(mod_name));
        for resource in resources {
            assert!(catalog.add_resource(resource).is_empty());
        }
        catalog
    }

    #[test]
    fn test_merge_disjoint() {
        let a = catalog_of("app", vec![Resource::new(name("app.query.q"))]);
        let b = catalog_of(
            "lib",
            vec![
                Resource::new(name("lib.query.q")),
                Resource::new(name("lib.chart.c")),
            ],
        );

        let out = a.merge(&[b]);
        assert!(out.diagnostics.is_empty());
        assert_eq!(out.catalog.len(), 3);
        assert_eq!(out.catalog.root_mod().name, "app");
        let mods: Vec<&str> = out.catalog.mods().map(|m| m.name.as_str()).collect();
        assert_eq!(mods, vec!["app", "lib"]);
    }

    #[test]
    fn test_merge_locals_from_self_only() {
        let a = catalog_of("app", vec![Resource::new(name("app.query.mine"))]);
        let b = catalog_of("lib", vec![Resource::new(name("lib.query.theirs"))]);

        let out = a.merge(&[b]);
        assert!(out.catalog.local(ResourceKind::Query, "mine").is_some());
        assert!(out.catalog.local(ResourceKind::Query, "theirs").is_none());
        assert!(out.catalog.get(&name("lib.query.theirs")).is_some());
    }

    #[test]
    fn test_merge_variables_root_only() {
        let a = catalog_of("app", vec![Resource::new(name("app.variable.region"))]);
        let b = catalog_of("lib", vec![Resource::new(name("lib.variable.limit"))]);

        let out = a.merge(&[b]);
        assert!(out.catalog.variable("region").is_some());
        assert!(out.catalog.variable("limit").is_none());
    }

    #[test]
    fn test_merge_conflict_first_wins() {
        let a = catalog_of("app", vec![Resource::new(name("lib.query.q")).with_sql("select 1")]);
        let b = catalog_of("lib", vec![Resource::new(name("lib.query.q")).with_sql("select 2")]);

        let out = a.merge(&[b]);
        assert_eq!(out.diagnostics.len(), 1);
        let diag = out.diagnostics.iter().next().unwrap();
        assert_eq!(diag.kind, DiagnosticKind::ConflictingDeclaration);
        let kept = out.catalog.get(&name("lib.query.q")).unwrap();
        assert_eq!(kept.sql.as_deref(), Some("select 1"));
    }

    #[test]
    fn test_merge_identical_redeclaration_silent() {
        let lib = catalog_of("lib", vec![Resource::new(name("lib.query.q")).with_sql("select 1")]);
        let app = catalog_of("app", vec![]);

        // the same dependency reached twice through the graph
        let out = app.merge(&[lib.clone(), lib]);
        assert!(out.diagnostics.is_empty());
        assert_eq!(out.catalog.len(), 1);
    }

    #[test]
    fn test_merge_dashboard_inputs_per_entry() {
        let dashboard = name("app.dashboard.d");
        let a = catalog_of(
            "app",
            vec![Resource::new(name("app.input.one")).with_dashboard(dashboard.clone())],
        );
        let b = catalog_of(
            "app",
            vec![Resource::new(name("app.input.two")).with_dashboard(dashboard.clone())],
        );

        let out = a.merge(&[b]);
        assert_eq!(out.catalog.inputs_for_dashboard(&dashboard).count(), 2);
    }

    #[test]
    fn test_merge_leaves_references_empty() {
        let a = catalog_of(
            "app",
            vec![Resource::new(name("app.chart.c")).with_reference("app.query.q")],
        );
        let out = a.merge(&[]);
        assert!(out.catalog.references().is_empty());
    }

    proptest::proptest! {
        #[test]
        fn prop_disjoint_merge_is_union(
            left in prop::collection::btree_set("[a-m]{1,4}", 0..12),
            right in prop::collection::btree_set("[n-z]{1,4}", 0..12),
        ) {
            let a = catalog_of(
                "app",
                left.iter().map(|n| Resource::new(QualifiedName::new("app", ResourceKind::Chart, n.as_str()).unwrap())).collect(),
            );
            let b = catalog_of(
                "lib",
                right.iter().map(|n| Resource::new(QualifiedName::new("lib", ResourceKind::Chart, n.as_str()).unwrap())).collect(),
            );

            let out = a.merge(&[b]);
            prop_assert!(out.diagnostics.is_empty());
            prop_assert_eq!(out.catalog.count(ResourceKind::Chart), left.len() + right.len());
            for n in &left {
                let qualified = QualifiedName::new("app", ResourceKind::Chart, n.as_str()).unwrap();
                prop_assert!(out.catalog.get(&qualified).is_some());
            }
            for n in &right {
                let qualified = QualifiedName::new("lib", ResourceKind::Chart, n.as_str()).unwrap();
                prop_assert!(out.catalog.get(&qualified).is_some());
            }
        }
    }
}
