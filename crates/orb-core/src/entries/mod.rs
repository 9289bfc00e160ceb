//! Registry entry types.
//!
//! This module provides the entry types stored in the type registry:
//!
//! - [`TypeDescriptor`] - Unified enum wrapping every entry kind
//! - [`InterfaceEntry`] - Interfaces with methods, attributes and bases
//! - [`StructEntry`] - Structs and exception structs
//! - [`EnumEntry`] - Enumeration types
//! - [`ConstantsEntry`] - Constant groups
//! - [`TypedefEntry`] - Type aliases
//! - [`ServiceEntry`] - Services and singletons
//! - [`ModuleEntry`] - IDL module declarations

mod compound;
mod constants;
mod enum_entry;
mod interface;
mod module_entry;
mod service;
mod type_descriptor;
mod typedef;

pub use compound::{FieldEntry, StructEntry};
pub use constants::ConstantsEntry;
pub use enum_entry::{EnumEntry, EnumValue};
pub use interface::{
    AttributeEntry, AttributeFlags, InterfaceEntry, MemberKind, MethodFlags, MethodSignature,
    Param, ParamDirection,
};
pub use module_entry::ModuleEntry;
pub use service::{ConstructorEntry, ServiceEntry};
pub use type_descriptor::{ReferenceRole, TypeDescriptor, TypeKind, TypeReference};
pub use typedef::TypedefEntry;

