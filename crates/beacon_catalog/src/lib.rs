//! BEACON Catalog
//!
//! Typed, collision-free namespace of the resources declared by a mod and
//! its dependencies. A catalog is populated once per parse, merged with the
//! catalogs of its dependencies, and treated as immutable afterwards.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod diagnostic;
pub mod diff;
pub mod merge;
pub mod reference;
pub mod workspace;

pub use catalog::{Catalog, ModInfo};
pub use diagnostic::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use diff::{CatalogDiff, DiffSummary};
pub use merge::MergeOutput;
pub use reference::ReferenceIndex;
pub use workspace::{load_workspace, LoadError, LoadedWorkspace, ModSource, WorkspaceFile};
