//! Type registry for the orb component runtime.
//!
//! - [`TypeRegistry`]: canonical descriptors by qualified name, with module
//!   ownership, alias and constant resolution and hierarchy queries
//! - [`NamespaceTree`]: the registry's hierarchical view
//! - [`BindingExport`]: a deterministic projection of the registry for one
//!   embedding environment
//! - [`builtins`]: the interface and exception roots every registry starts with

pub mod binding;
pub mod builtins;
mod namespace_tree;
mod registry;
mod validate;

pub use binding::{BindingExport, BindingLeaf, BindingNode};
pub use namespace_tree::{NamespaceData, NamespaceEdge, NamespaceTree};
pub use registry::TypeRegistry;
