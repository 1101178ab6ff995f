//! Reference index.
//!
//! Collects the references held by every referenceable resource into one
//! map keyed by the reference's text form, so repeated references collapse.

use crate::catalog::Catalog;
use crate::diagnostic::{Diagnostic, Diagnostics};
use beacon_core::ResourceReference;
use indexmap::IndexMap;
use std::convert::Infallible;

/// Every reference held by a catalog's referenceable resources
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceIndex {
    entries: IndexMap<String, ResourceReference>,
}

impl ReferenceIndex {
    /// Build the index in one walk over `catalog`
    #[must_use]
    pub fn build(catalog: &Catalog) -> Self {
        let mut entries = IndexMap::new();
        let Ok(()) = catalog.walk_resources(|resource| {
            if resource.kind().is_referenceable() {
                for reference in &resource.references {
                    entries.insert(reference.to_string(), reference.clone());
                }
            }
            Ok::<_, Infallible>(true)
        });
        Self { entries }
    }

    /// Look up by text form
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ResourceReference> {
        self.entries.get(key)
    }

    /// Number of distinct references
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in discovery order
    pub fn iter(&self) -> impl Iterator<Item = &ResourceReference> + '_ {
        self.entries.values()
    }

    /// References whose target is `to`
    pub fn referencing<'a>(&'a self, to: &'a str) -> impl Iterator<Item = &'a ResourceReference> + 'a {
        self.entries.values().filter(move |reference| reference.to == to)
    }

    /// One diagnostic per reference whose target is absent from `catalog`
    #[must_use]
    pub fn unresolved(&self, catalog: &Catalog) -> Diagnostics {
        self.entries
            .values()
            .filter(|reference| catalog.resolve(&reference.to).is_none())
            .map(Diagnostic::unresolved)
            .collect()
    }
}

impl Catalog {
    /// Rebuild the reference index from the current resources
    pub fn populate_references(&mut self) {
        self.references = ReferenceIndex::build(self);
        tracing::debug!(references = self.references.len(), "reference index populated");
    }

    /// Check every indexed reference resolves
    #[must_use]
    pub fn validate_references(&self) -> Diagnostics {
        self.references.unresolved(self)
    }
}
