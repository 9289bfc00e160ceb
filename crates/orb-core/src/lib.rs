//! Core types for the orb component runtime.
//!
//! This crate holds everything the registry and the runtime share:
//!
//! - Identity: [`QualifiedName`], [`TypeHash`], [`ModuleId`]
//! - Type descriptions: [`entries`] ([`TypeDescriptor`] and its payloads),
//!   [`TypeRef`], [`ConstantValue`]
//! - Native calls and objects: [`runtime`] ([`Value`], [`CallContext`],
//!   [`ComponentClass`], [`ObjectHeap`])
//! - Errors: [`error`] and [`native_error`]

mod constant;
pub mod convert;
pub mod entries;
pub mod error;
mod ids;
pub mod native_error;
mod qualified_name;
pub mod runtime;
mod type_hash;
mod type_ref;

pub use constant::ConstantValue;
pub use convert::{FromValue, IntoValue};
pub use entries::{
    AttributeEntry, ConstantsEntry, ConstructorEntry, EnumEntry, FieldEntry, InterfaceEntry,
    MethodSignature, ModuleEntry, Param, ParamDirection, ServiceEntry, StructEntry,
    TypeDescriptor, TypeKind, TypedefEntry,
};
pub use error::{
    DispatchError, FactoryError, ModuleError, ObjectError, OrbError, RegistrationError,
    TypedException,
};
pub use ids::ModuleId;
pub use native_error::{ConversionError, NativeError, RaisedException};
pub use qualified_name::QualifiedName;
pub use runtime::{
    CallContext, ComponentClass, NativeFactory, NativeFn, NewInstance, ObjectData, ObjectHandle,
    ObjectHeap, StructValue, Value,
};
pub use type_hash::{TypeHash, hash_constants};
pub use type_ref::{PrimitiveKind, TypeRef};
