//! Types every registry starts with.

use orb_core::{InterfaceEntry, PrimitiveKind, StructEntry, TypeDescriptor, TypeRef};

/// Root of every interface hierarchy.
pub const BASE_INTERFACE: &str = "orb.XInterface";

/// Root of every exception chain.
pub const BASE_EXCEPTION: &str = "orb.Exception";

/// Fallback for failures that match no registered exception.
pub const RUNTIME_ERROR: &str = "orb.RuntimeError";

/// Field carrying the exception text.
pub const MESSAGE_FIELD: &str = "Message";

/// Field carrying the object that raised the exception.
pub const CONTEXT_FIELD: &str = "Context";

/// Descriptors for the built-in types, in registration order.
pub fn descriptors() -> Vec<TypeDescriptor> {
    vec![
        TypeDescriptor::Interface(InterfaceEntry::new(BASE_INTERFACE)),
        TypeDescriptor::Exception(
            StructEntry::new(BASE_EXCEPTION)
                .with_field(MESSAGE_FIELD, PrimitiveKind::String.into())
                .with_field(CONTEXT_FIELD, TypeRef::named(BASE_INTERFACE)),
        ),
        TypeDescriptor::Exception(StructEntry::new(RUNTIME_ERROR).with_base(BASE_EXCEPTION)),
    ]
}
