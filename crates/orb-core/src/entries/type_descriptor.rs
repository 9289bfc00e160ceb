//! TypeDescriptor enum for unified type storage.
//!
//! This module provides [`TypeDescriptor`], a single enum that wraps every
//! entry kind for storage, iteration and lookup in the registry, and
//! [`TypeKind`], its fieldless discriminant.

use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{QualifiedName, TypeHash, TypeRef};

use super::{
    ConstantsEntry, EnumEntry, InterfaceEntry, ModuleEntry, ServiceEntry, StructEntry,
    TypedefEntry,
};

/// Kind of a registered type.
///
/// The numeric values are stable and cross the raw ABI boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum TypeKind {
    Interface = 1,
    Struct = 2,
    Enum = 3,
    Exception = 4,
    Constants = 5,
    Typedef = 6,
    Service = 7,
    Singleton = 8,
    Module = 9,
}

impl TypeKind {
    /// Lowercase IDL keyword for this kind.
    pub const fn keyword(self) -> &'static str {
        match self {
            TypeKind::Interface => "interface",
            TypeKind::Struct => "struct",
            TypeKind::Enum => "enum",
            TypeKind::Exception => "exception",
            TypeKind::Constants => "constants",
            TypeKind::Typedef => "typedef",
            TypeKind::Service => "service",
            TypeKind::Singleton => "singleton",
            TypeKind::Module => "module",
        }
    }

    /// Kinds usable as a value type in signatures and fields.
    pub const fn is_value_type(self) -> bool {
        matches!(
            self,
            TypeKind::Interface
                | TypeKind::Struct
                | TypeKind::Enum
                | TypeKind::Exception
                | TypeKind::Typedef
        )
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Why a descriptor mentions another type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceRole {
    /// Inherited interface, struct base or exception base.
    Base,
    /// Entry of a `raises` clause.
    Raises,
    /// Parameter, return, field, attribute or alias type.
    Member,
    /// Interface implemented by a service or singleton.
    Implements,
}

/// One reference from a descriptor to another named type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeReference<'a> {
    pub role: ReferenceRole,
    pub name: &'a QualifiedName,
}

/// Unified type descriptor for registry storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    Interface(InterfaceEntry),
    Struct(StructEntry),
    Enum(EnumEntry),
    Exception(StructEntry),
    Constants(ConstantsEntry),
    Typedef(TypedefEntry),
    Service(ServiceEntry),
    Singleton(ServiceEntry),
    Module(ModuleEntry),
}

impl TypeDescriptor {
    /// Get the fully qualified name.
    pub fn name(&self) -> &QualifiedName {
        match self {
            TypeDescriptor::Interface(e) => &e.name,
            TypeDescriptor::Struct(e) | TypeDescriptor::Exception(e) => &e.name,
            TypeDescriptor::Enum(e) => &e.name,
            TypeDescriptor::Constants(e) => &e.name,
            TypeDescriptor::Typedef(e) => &e.name,
            TypeDescriptor::Service(e) | TypeDescriptor::Singleton(e) => &e.name,
            TypeDescriptor::Module(e) => &e.name,
        }
    }

    /// Get the type hash for this entry.
    pub fn type_hash(&self) -> TypeHash {
        match self {
            TypeDescriptor::Interface(e) => e.type_hash,
            TypeDescriptor::Struct(e) | TypeDescriptor::Exception(e) => e.type_hash,
            TypeDescriptor::Enum(e) => e.type_hash,
            TypeDescriptor::Constants(e) => e.type_hash,
            TypeDescriptor::Typedef(e) => e.type_hash,
            TypeDescriptor::Service(e) | TypeDescriptor::Singleton(e) => e.type_hash,
            TypeDescriptor::Module(e) => e.type_hash,
        }
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            TypeDescriptor::Interface(_) => TypeKind::Interface,
            TypeDescriptor::Struct(_) => TypeKind::Struct,
            TypeDescriptor::Enum(_) => TypeKind::Enum,
            TypeDescriptor::Exception(_) => TypeKind::Exception,
            TypeDescriptor::Constants(_) => TypeKind::Constants,
            TypeDescriptor::Typedef(_) => TypeKind::Typedef,
            TypeDescriptor::Service(_) => TypeKind::Service,
            TypeDescriptor::Singleton(_) => TypeKind::Singleton,
            TypeDescriptor::Module(_) => TypeKind::Module,
        }
    }

    // === Type Checks ===

    pub fn is_interface(&self) -> bool {
        matches!(self, TypeDescriptor::Interface(_))
    }

    pub fn is_exception(&self) -> bool {
        matches!(self, TypeDescriptor::Exception(_))
    }

    /// Service or singleton.
    pub fn is_instantiable(&self) -> bool {
        matches!(self, TypeDescriptor::Service(_) | TypeDescriptor::Singleton(_))
    }

    // === Downcasting ===

    pub fn as_interface(&self) -> Option<&InterfaceEntry> {
        match self {
            TypeDescriptor::Interface(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructEntry> {
        match self {
            TypeDescriptor::Struct(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_exception(&self) -> Option<&StructEntry> {
        match self {
            TypeDescriptor::Exception(e) => Some(e),
            _ => None,
        }
    }

    /// Struct or exception layout.
    pub fn as_compound(&self) -> Option<&StructEntry> {
        match self {
            TypeDescriptor::Struct(e) | TypeDescriptor::Exception(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumEntry> {
        match self {
            TypeDescriptor::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_constants(&self) -> Option<&ConstantsEntry> {
        match self {
            TypeDescriptor::Constants(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_typedef(&self) -> Option<&TypedefEntry> {
        match self {
            TypeDescriptor::Typedef(e) => Some(e),
            _ => None,
        }
    }

    /// Service or singleton payload.
    pub fn as_service(&self) -> Option<&ServiceEntry> {
        match self {
            TypeDescriptor::Service(e) | TypeDescriptor::Singleton(e) => Some(e),
            _ => None,
        }
    }

    /// Every named type this descriptor refers to.
    pub fn references(&self) -> Vec<TypeReference<'_>> {
        fn push_ty<'a>(refs: &mut Vec<TypeReference<'a>>, ty: &'a TypeRef) {
            if let Some(name) = ty.referenced_name() {
                refs.push(TypeReference {
                    role: ReferenceRole::Member,
                    name,
                });
            }
        }
        fn push_all<'a>(
            refs: &mut Vec<TypeReference<'a>>,
            role: ReferenceRole,
            names: &'a [QualifiedName],
        ) {
            refs.extend(names.iter().map(|name| TypeReference { role, name }));
        }

        let mut refs = Vec::new();
        match self {
            TypeDescriptor::Interface(e) => {
                push_all(&mut refs, ReferenceRole::Base, &e.bases);
                for m in &e.methods {
                    push_ty(&mut refs, &m.return_type);
                    for p in &m.params {
                        push_ty(&mut refs, &p.ty);
                    }
                    push_all(&mut refs, ReferenceRole::Raises, &m.raises);
                }
                for a in &e.attributes {
                    push_ty(&mut refs, &a.ty);
                    push_all(&mut refs, ReferenceRole::Raises, &a.get_raises);
                    push_all(&mut refs, ReferenceRole::Raises, &a.set_raises);
                }
            }
            TypeDescriptor::Struct(e) | TypeDescriptor::Exception(e) => {
                if let Some(base) = &e.base {
                    refs.push(TypeReference {
                        role: ReferenceRole::Base,
                        name: base,
                    });
                }
                for f in &e.fields {
                    push_ty(&mut refs, &f.ty);
                }
            }
            TypeDescriptor::Typedef(e) => push_ty(&mut refs, &e.target),
            TypeDescriptor::Service(e) | TypeDescriptor::Singleton(e) => {
                if let Some(iface) = &e.interface {
                    refs.push(TypeReference {
                        role: ReferenceRole::Implements,
                        name: iface,
                    });
                }
                for c in &e.constructors {
                    for p in &c.params {
                        push_ty(&mut refs, &p.ty);
                    }
                    push_all(&mut refs, ReferenceRole::Raises, &c.raises);
                }
            }
            TypeDescriptor::Enum(_) | TypeDescriptor::Constants(_) | TypeDescriptor::Module(_) => {}
        }
        refs
    }
}

impl From<InterfaceEntry> for TypeDescriptor {
    fn from(entry: InterfaceEntry) -> Self {
        TypeDescriptor::Interface(entry)
    }
}

impl From<StructEntry> for TypeDescriptor {
    fn from(entry: StructEntry) -> Self {
        TypeDescriptor::Struct(entry)
    }
}

impl From<ServiceEntry> for TypeDescriptor {
    fn from(entry: ServiceEntry) -> Self {
        TypeDescriptor::Service(entry)
    }
}

impl From<EnumEntry> for TypeDescriptor {
    fn from(entry: EnumEntry) -> Self {
        TypeDescriptor::Enum(entry)
    }
}

impl From<ConstantsEntry> for TypeDescriptor {
    fn from(entry: ConstantsEntry) -> Self {
        TypeDescriptor::Constants(entry)
    }
}

impl From<TypedefEntry> for TypeDescriptor {
    fn from(entry: TypedefEntry) -> Self {
        TypeDescriptor::Typedef(entry)
    }
}

impl From<ModuleEntry> for TypeDescriptor {
    fn from(entry: ModuleEntry) -> Self {
        TypeDescriptor::Module(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entries::{MethodSignature, Param};
    use crate::{ConstantValue, PrimitiveKind};

    #[test]
    fn kind_round_trips_through_u8() {
        for kind in [
            TypeKind::Interface,
            TypeKind::Struct,
            TypeKind::Enum,
            TypeKind::Exception,
            TypeKind::Constants,
            TypeKind::Typedef,
            TypeKind::Service,
            TypeKind::Singleton,
            TypeKind::Module,
        ] {
            let raw: u8 = kind.into();
            assert_eq!(TypeKind::try_from(raw).ok(), Some(kind));
        }
        assert!(TypeKind::try_from(0u8).is_err());
    }

    #[test]
    fn descriptor_accessors() {
        let desc = TypeDescriptor::from(
            ConstantsEntry::new("orb.awt.FontWeight").with_constant("BOLD", ConstantValue::float(150.0)),
        );
        assert_eq!(desc.kind(), TypeKind::Constants);
        assert_eq!(desc.name().to_string(), "orb.awt.FontWeight");
        assert_eq!(desc.type_hash(), TypeHash::from_name("orb.awt.FontWeight"));
        assert!(desc.as_constants().is_some());
        assert!(desc.as_interface().is_none());
    }

    #[test]
    fn exception_and_struct_are_distinct_kinds() {
        let entry = StructEntry::new("orb.Thing");
        let s = TypeDescriptor::Struct(entry.clone());
        let e = TypeDescriptor::Exception(entry);
        assert_ne!(s, e);
        assert!(s.as_compound().is_some());
        assert!(e.as_compound().is_some());
        assert!(s.as_exception().is_none());
    }

    #[test]
    fn references_cover_bases_members_and_raises() {
        let iface = InterfaceEntry::new("orb.io.XInputStream")
            .with_base("orb.XInterface")
            .with_method(
                MethodSignature::new("readBytes", PrimitiveKind::Long.into())
                    .with_param(Param::input(
                        "data",
                        TypeRef::sequence(TypeRef::named("orb.io.Chunk")),
                    ))
                    .raises("orb.io.IOException"),
            );
        let desc = TypeDescriptor::from(iface);
        let refs: Vec<(ReferenceRole, String)> = desc
            .references()
            .into_iter()
            .map(|r| (r.role, r.name.to_string()))
            .collect();

        assert_eq!(
            refs,
            vec![
                (ReferenceRole::Base, "orb.XInterface".to_string()),
                (ReferenceRole::Member, "orb.io.Chunk".to_string()),
                (ReferenceRole::Raises, "orb.io.IOException".to_string()),
            ]
        );
    }
}
