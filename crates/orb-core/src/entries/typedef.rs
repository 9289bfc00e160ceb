//! Typedef entry.

use crate::{QualifiedName, TypeHash, TypeRef};

/// Registry entry for a type alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedefEntry {
    /// Fully qualified name.
    pub name: QualifiedName,
    /// Type hash for identity.
    pub type_hash: TypeHash,
    /// The aliased type. May itself name another typedef.
    pub target: TypeRef,
}

impl TypedefEntry {
    pub fn new(name: impl Into<QualifiedName>, target: TypeRef) -> Self {
        let name = name.into();
        let type_hash = name.to_type_hash();
        Self {
            name,
            type_hash,
            target,
        }
    }
}
