//! BEACON Core Types
//!
//! Pure types shared by the catalog and the execution engine: resource
//! kinds, qualified names, the resource value itself, references, and ids.
//! Nothing in this crate performs I/O.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod id;
pub mod kind;
pub mod name;
pub mod reference;
pub mod resource;

// Re-exports
pub use error::{CoreError, CoreResult};
pub use id::{ResultId, RunId};
pub use kind::ResourceKind;
pub use name::QualifiedName;
pub use reference::ResourceReference;
pub use resource::{ArgValue, Resource};
