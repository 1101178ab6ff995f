//! Catalog diagnostics.
//!
//! Problems found while loading a catalog are collected here rather than
//! returned as errors, so one bad resource never hides the rest.

use beacon_core::{Resource, ResourceReference};
use serde::Serialize;

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The catalog is not what the author declared
    Error,
    /// The catalog was resolved by policy; worth a look
    Warning,
}

/// What went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Two declarations share a qualified name within one mod
    DuplicateResource,
    /// A later catalog redeclares a name differently during merge
    ConflictingDeclaration,
    /// A reference names a resource that does not exist
    UnresolvedReference,
}

/// A single diagnostic attached to a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Severity
    pub severity: Severity,
    /// Kind of problem
    pub kind: DiagnosticKind,
    /// Qualified name of the offending resource
    pub subject: String,
    /// One-line summary
    pub summary: String,
    /// Longer explanation
    pub detail: String,
}

impl Diagnostic {
    /// Duplicate declaration of `existing` by `duplicate`
    #[must_use]
    pub fn duplicate(existing: &Resource, duplicate: &Resource) -> Self {
        Self {
            severity: Severity::Error,
            kind: DiagnosticKind::DuplicateResource,
            subject: duplicate.name.to_string(),
            summary: format!("Duplicate {} '{}'", duplicate.kind(), duplicate.name),
            detail: format!(
                "A {} named '{}' has already been declared in mod '{}'",
                existing.kind(),
                existing.short_name(),
                existing.mod_name()
            ),
        }
    }

    /// Differing redeclaration found while merging; `kept` wins
    #[must_use]
    pub fn conflicting(kept: &Resource, ignored: &Resource) -> Self {
        Self {
            severity: Severity::Warning,
            kind: DiagnosticKind::ConflictingDeclaration,
            subject: ignored.name.to_string(),
            summary: format!("Conflicting declaration of {} '{}'", ignored.kind(), ignored.name),
            detail: format!(
                "'{}' was first declared by mod '{}'; the later, different declaration was ignored",
                kept.name,
                kept.mod_name()
            ),
        }
    }

    /// Reference to a resource that is not in the catalog
    #[must_use]
    pub fn unresolved(reference: &ResourceReference) -> Self {
        Self {
            severity: Severity::Error,
            kind: DiagnosticKind::UnresolvedReference,
            subject: reference.from.to_string(),
            summary: format!("Unresolved reference to '{}'", reference.to),
            detail: format!("'{}' refers to '{}', which does not exist", reference.from, reference.to),
        }
    }

    /// Whether this is an error
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}: {}", level, self.summary, self.detail)
    }
}

/// Ordered collection of diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    /// Create an empty collection
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a diagnostic
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    /// Whether any diagnostic is an error
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    /// Number of diagnostics
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no diagnostics
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Self(vec![diagnostic])
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
