//! Struct and exception type entries.
//!
//! Plain structs and exception structs share one layout: ordered fields and an
//! optional base of the same kind. The kind is recorded by the
//! [`TypeDescriptor`](super::TypeDescriptor) variant that wraps the entry.

use crate::{QualifiedName, TypeHash, TypeRef};

/// A struct field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldEntry {
    pub name: String,
    pub ty: TypeRef,
}

impl FieldEntry {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Registry entry for a struct or exception struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructEntry {
    /// Fully qualified name.
    pub name: QualifiedName,
    /// Type hash for identity.
    pub type_hash: TypeHash,
    /// Base struct (exceptions form a single-rooted chain).
    pub base: Option<QualifiedName>,
    /// Fields declared on this struct, excluding inherited ones.
    pub fields: Vec<FieldEntry>,
}

impl StructEntry {
    pub fn new(name: impl Into<QualifiedName>) -> Self {
        let name = name.into();
        let type_hash = name.to_type_hash();
        Self {
            name,
            type_hash,
            base: None,
            fields: Vec::new(),
        }
    }

    /// Set the base type.
    pub fn with_base(mut self, base: impl Into<QualifiedName>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Add a field.
    pub fn with_field(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.fields.push(FieldEntry::new(name, ty));
        self
    }

    /// Find an own field by name.
    pub fn field(&self, name: &str) -> Option<&FieldEntry> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PrimitiveKind;

    #[test]
    fn struct_entry_fields() {
        let entry = StructEntry::new("orb.awt.Point")
            .with_field("X", PrimitiveKind::Long.into())
            .with_field("Y", PrimitiveKind::Long.into());

        assert_eq!(entry.fields.len(), 2);
        assert!(entry.field("Y").is_some());
        assert!(entry.field("Z").is_none());
        assert!(entry.base.is_none());
    }

    #[test]
    fn exception_chain() {
        let entry = StructEntry::new("orb.io.IOException").with_base("orb.Exception");
        assert_eq!(entry.base, Some(QualifiedName::from("orb.Exception")));
    }
}
