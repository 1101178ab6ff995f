//! Change detection between two catalogs.
//!
//! Used after a reparse to decide whether anything a client can see has
//! changed. Every mapping is compared, local mirrors and per-dashboard
//! inputs included, so `a.equals(&b) == b.equals(&a)` always holds.

use crate::catalog::Catalog;
use beacon_core::{Resource, ResourceKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Where an entry lives inside a catalog
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Scope {
    Kind(ResourceKind),
    Dashboard(String),
    Local(ResourceKind),
}

/// Names added, removed or modified between two catalogs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDiff {
    /// Present only in the newer catalog
    pub added: Vec<String>,
    /// Present only in the older catalog
    pub removed: Vec<String>,
    /// Present in both with different content
    pub modified: Vec<String>,
}

/// Change counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    /// Number of names added
    pub added_count: usize,
    /// Number of names removed
    pub removed_count: usize,
    /// Number of names modified
    pub modified_count: usize,
}

impl CatalogDiff {
    /// Whether the catalogs hold the same resources
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// Change counts
    #[must_use]
    pub fn summary(&self) -> DiffSummary {
        DiffSummary {
            added_count: self.added.len(),
            removed_count: self.removed.len(),
            modified_count: self.modified.len(),
        }
    }
}

impl Catalog {
    /// Compare `self` (older) against `other` (newer)
    #[must_use]
    pub fn diff(&self, other: &Catalog) -> CatalogDiff {
        let before = self.entries();
        let after = other.entries();

        let mut added = BTreeSet::new();
        let mut removed = BTreeSet::new();
        let mut modified = BTreeSet::new();

        for (scope, old) in &before {
            match after.get(scope) {
                None => {
                    removed.insert(old.name.to_string());
                }
                Some(new) if !Arc::ptr_eq(old, new) && old != new => {
                    modified.insert(old.name.to_string());
                }
                Some(_) => {}
            }
        }
        for (scope, new) in &after {
            if !before.contains_key(scope) {
                added.insert(new.name.to_string());
            }
        }

        CatalogDiff {
            added: added.into_iter().collect(),
            removed: removed.into_iter().collect(),
            modified: modified.into_iter().collect(),
        }
    }

    /// Structural equality over every kind-specific mapping
    #[must_use]
    pub fn equals(&self, other: &Catalog) -> bool {
        self.diff(other).is_empty()
    }

    fn entries(&self) -> BTreeMap<(Scope, &str), &Arc<Resource>> {
        let global = self
            .resources
            .iter()
            .flat_map(|(kind, entries)| entries.iter().map(move |(key, r)| ((Scope::Kind(*kind), key.as_str()), r)));
        let scoped = self.dashboard_inputs.iter().flat_map(|(dashboard, inputs)| {
            inputs
                .iter()
                .map(move |(key, r)| ((Scope::Dashboard(dashboard.clone()), key.as_str()), r))
        });
        let local = self
            .local
            .iter()
            .flat_map(|(kind, entries)| entries.iter().map(move |(key, r)| ((Scope::Local(*kind), key.as_str()), r)));
        global.chain(scoped).chain(local).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ModInfo;
    use beacon_core::QualifiedName;
    use proptest::prelude::*;
    use serde_json::json;

    fn name(text: &str) -> QualifiedName {
        text.parse().unwrap()
    }

    fn catalog_of(resources: Vec<Resource>) -> Catalog {
        let mut catalog = Catalog::new(ModInfo::new("demo"));
        for resource in resources {
            catalog.add_resource(resource);
        }
        catalog
    }

    #[test]
    fn test_identical_catalogs_equal() {
        let a = catalog_of(vec![
            Resource::new(name("demo.query.q")).with_sql("select 1"),
            Resource::new(name("demo.chart.c")).with_query(name("demo.query.q")),
        ]);
        let b = a.clone();
        assert!(a.equals(&b));
        assert!(a.diff(&b).is_empty());
    }

    #[test]
    fn test_attribute_change_detected() {
        let a = catalog_of(vec![Resource::new(name("demo.chart.c")).with_property("type", json!("bar"))]);
        let b = catalog_of(vec![Resource::new(name("demo.chart.c")).with_property("type", json!("line"))]);

        let diff = a.diff(&b);
        assert_eq!(diff.modified, vec!["demo.chart.c"]);
        assert!(!a.equals(&b));
    }

    #[test]
    fn test_added_and_removed() {
        let a = catalog_of(vec![Resource::new(name("demo.text.old"))]);
        let b = catalog_of(vec![Resource::new(name("demo.text.new"))]);

        let diff = a.diff(&b);
        assert_eq!(diff.added, vec!["demo.text.new"]);
        assert_eq!(diff.removed, vec!["demo.text.old"]);
        assert_eq!(
            diff.summary(),
            DiffSummary {
                added_count: 1,
                removed_count: 1,
                modified_count: 0
            }
        );
    }

    #[test]
    fn test_extra_entry_breaks_equality_both_ways() {
        let a = catalog_of(vec![Resource::new(name("demo.local.x"))]);
        let b = catalog_of(vec![]);
        assert!(!a.equals(&b));
        assert!(!b.equals(&a));
    }

    #[test]
    fn test_dashboard_input_moved() {
        let a = catalog_of(vec![Resource::new(name("demo.input.i")).with_dashboard(name("demo.dashboard.one"))]);
        let b = catalog_of(vec![Resource::new(name("demo.input.i")).with_dashboard(name("demo.dashboard.two"))]);
        assert!(!a.equals(&b));
    }

    fn arb_catalog() -> impl Strategy<Value = Catalog> {
        let kinds = prop::sample::select(vec![
            ResourceKind::Query,
            ResourceKind::Chart,
            ResourceKind::Input,
            ResourceKind::Local,
        ]);
        prop::collection::vec((kinds, "[a-c]", prop::option::of("[a-z]{1,3}")), 0..10).prop_map(|entries| {
            catalog_of(
                entries
                    .into_iter()
                    .map(|(kind, short, sql)| {
                        let resource = Resource::new(QualifiedName::new("demo", kind, short).unwrap());
                        match sql {
                            Some(sql) => resource.with_sql(sql),
                            None => resource,
                        }
                    })
                    .collect(),
            )
        })
    }

    proptest::proptest! {
        #[test]
        fn prop_equals_is_symmetric(a in arb_catalog(), b in arb_catalog()) {
            prop_assert_eq!(a.equals(&b), b.equals(&a));
        }

        #[test]
        fn prop_equals_is_reflexive(a in arb_catalog()) {
            prop_assert!(a.equals(&a.clone()));
        }

        #[test]
        fn prop_diff_inverts(a in arb_catalog(), b in arb_catalog()) {
            let forward = a.diff(&b);
            let backward = b.diff(&a);
            prop_assert_eq!(forward.added, backward.removed);
            prop_assert_eq!(forward.modified, backward.modified);
        }
    }
}
