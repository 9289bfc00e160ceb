//! Type references used in signatures, fields and typedefs.
//!
//! A [`TypeRef`] names a type without owning its description: primitives are
//! built in, sequences wrap an element type, and everything else refers to a
//! registry entry by [`QualifiedName`].

use std::fmt;

use crate::{QualifiedName, TypeHash};

/// Built-in type kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    Void,
    Boolean,
    Byte,
    Short,
    UnsignedShort,
    Long,
    UnsignedLong,
    Hyper,
    UnsignedHyper,
    Float,
    Double,
    Char,
    String,
    Type,
    Any,
}

impl PrimitiveKind {
    /// Every primitive kind, in declaration order.
    pub const ALL: [PrimitiveKind; 15] = [
        PrimitiveKind::Void,
        PrimitiveKind::Boolean,
        PrimitiveKind::Byte,
        PrimitiveKind::Short,
        PrimitiveKind::UnsignedShort,
        PrimitiveKind::Long,
        PrimitiveKind::UnsignedLong,
        PrimitiveKind::Hyper,
        PrimitiveKind::UnsignedHyper,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
        PrimitiveKind::Char,
        PrimitiveKind::String,
        PrimitiveKind::Type,
        PrimitiveKind::Any,
    ];

    /// IDL spelling of this primitive.
    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Void => "void",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Short => "short",
            PrimitiveKind::UnsignedShort => "unsigned short",
            PrimitiveKind::Long => "long",
            PrimitiveKind::UnsignedLong => "unsigned long",
            PrimitiveKind::Hyper => "hyper",
            PrimitiveKind::UnsignedHyper => "unsigned hyper",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Char => "char",
            PrimitiveKind::String => "string",
            PrimitiveKind::Type => "type",
            PrimitiveKind::Any => "any",
        }
    }

    /// Look up a primitive by its IDL spelling.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Get the TypeHash for this primitive.
    pub fn type_hash(self) -> TypeHash {
        TypeHash::from_name(self.name())
    }

    /// Integer kinds (signed and unsigned, any width).
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Byte
                | PrimitiveKind::Short
                | PrimitiveKind::UnsignedShort
                | PrimitiveKind::Long
                | PrimitiveKind::UnsignedLong
                | PrimitiveKind::Hyper
                | PrimitiveKind::UnsignedHyper
        )
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reference to a type from a signature, field or alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeRef {
    /// Built-in type.
    Primitive(PrimitiveKind),
    /// `sequence<T>`.
    Sequence(Box<TypeRef>),
    /// Registered type (interface, struct, enum, typedef, ...).
    Named(QualifiedName),
}

impl TypeRef {
    /// `void`.
    pub const VOID: TypeRef = TypeRef::Primitive(PrimitiveKind::Void);

    /// Reference a registered type by name.
    pub fn named(name: impl Into<QualifiedName>) -> Self {
        TypeRef::Named(name.into())
    }

    /// `sequence<element>`.
    pub fn sequence(element: TypeRef) -> Self {
        TypeRef::Sequence(Box::new(element))
    }

    /// Check for `void`.
    pub fn is_void(&self) -> bool {
        matches!(self, TypeRef::Primitive(PrimitiveKind::Void))
    }

    /// Get the primitive kind, if this is a primitive.
    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match self {
            TypeRef::Primitive(k) => Some(*k),
            _ => None,
        }
    }

    /// Get the referenced name, if this is a named type.
    pub fn as_named(&self) -> Option<&QualifiedName> {
        match self {
            TypeRef::Named(n) => Some(n),
            _ => None,
        }
    }

    /// The innermost named type, looking through sequences.
    pub fn referenced_name(&self) -> Option<&QualifiedName> {
        match self {
            TypeRef::Primitive(_) => None,
            TypeRef::Sequence(inner) => inner.referenced_name(),
            TypeRef::Named(n) => Some(n),
        }
    }

    /// Identity hash of the referenced type.
    ///
    /// Sequences hash their rendered form so `sequence<long>` is stable
    /// across modules.
    pub fn type_hash(&self) -> TypeHash {
        match self {
            TypeRef::Primitive(k) => k.type_hash(),
            TypeRef::Sequence(_) => TypeHash::from_name(&self.to_string()),
            TypeRef::Named(n) => n.to_type_hash(),
        }
    }
}

impl From<PrimitiveKind> for TypeRef {
    fn from(kind: PrimitiveKind) -> Self {
        TypeRef::Primitive(kind)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Primitive(k) => write!(f, "{k}"),
            TypeRef::Sequence(inner) => write!(f, "sequence<{inner}>"),
            TypeRef::Named(n) => write!(f, "{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_names_round_trip() {
        for kind in PrimitiveKind::ALL {
            assert_eq!(PrimitiveKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(PrimitiveKind::from_name("int"), None);
    }

    #[test]
    fn display() {
        let ty = TypeRef::sequence(TypeRef::sequence(PrimitiveKind::UnsignedHyper.into()));
        assert_eq!(ty.to_string(), "sequence<sequence<unsigned hyper>>");
        assert_eq!(TypeRef::named("orb.awt.Point").to_string(), "orb.awt.Point");
    }

    #[test]
    fn referenced_name_looks_through_sequences() {
        let ty = TypeRef::sequence(TypeRef::named("orb.awt.Point"));
        assert_eq!(
            ty.referenced_name().map(ToString::to_string).as_deref(),
            Some("orb.awt.Point")
        );
        assert!(TypeRef::VOID.referenced_name().is_none());
    }

    #[test]
    fn sequence_hash_differs_from_element() {
        let long = TypeRef::from(PrimitiveKind::Long);
        assert_ne!(long.type_hash(), TypeRef::sequence(long.clone()).type_hash());
        assert_eq!(
            TypeRef::sequence(long.clone()).type_hash(),
            TypeRef::sequence(long).type_hash()
        );
    }
}
