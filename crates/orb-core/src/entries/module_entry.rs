//! IDL module (namespace) entry.

use crate::{QualifiedName, TypeHash};

/// Registry entry for a declared IDL module.
///
/// Carries nothing beyond its name; it exists so empty namespaces can be
/// described and enumerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleEntry {
    /// Fully qualified name.
    pub name: QualifiedName,
    /// Type hash for identity.
    pub type_hash: TypeHash,
}

impl ModuleEntry {
    pub fn new(name: impl Into<QualifiedName>) -> Self {
        let name = name.into();
        let type_hash = name.to_type_hash();
        Self { name, type_hash }
    }
}
