//! Argument conformance, default values and object pinning.

use orb_core::runtime::HeapPin;
use orb_core::{
    ObjectError, ObjectHeap, PrimitiveKind, QualifiedName, StructValue, TypeDescriptor, TypeRef,
    Value,
};
use orb_registry::TypeRegistry;

/// Checks values against declared types.
///
/// Borrowed for the duration of one call's checks; holds no state of its own.
/// Pins taken through it borrow only the heap, so they may outlive the
/// registry guard the marshaller was built from.
pub(crate) struct Marshaller<'r, 'h> {
    registry: &'r TypeRegistry,
    heap: &'h ObjectHeap,
}

impl<'r, 'h> Marshaller<'r, 'h> {
    pub(crate) fn new(registry: &'r TypeRegistry, heap: &'h ObjectHeap) -> Self {
        Self { registry, heap }
    }

    /// Whether `value` is acceptable where `ty` is declared.
    ///
    /// Object references must be alive and implement the declared interface;
    /// null is accepted for any interface type.
    pub(crate) fn conforms(&self, ty: &TypeRef, value: &Value) -> bool {
        let Ok(ty) = self.registry.resolve_alias(ty) else {
            return false;
        };
        match (&ty, value) {
            (TypeRef::Primitive(kind), value) => primitive_conforms(*kind, value),
            (TypeRef::Sequence(element), Value::Sequence(items)) => {
                items.iter().all(|item| self.conforms(element, item))
            }
            (TypeRef::Sequence(_), _) => false,
            (TypeRef::Named(name), value) => self.named_conforms(name, value),
        }
    }

    fn named_conforms(&self, name: &QualifiedName, value: &Value) -> bool {
        let Some(desc) = self.registry.get(name) else {
            return false;
        };
        match (desc, value) {
            (TypeDescriptor::Interface(_), Value::Null) => true,
            (TypeDescriptor::Interface(iface), Value::Object(handle)) => self
                .heap
                .get(*handle)
                .is_ok_and(|data| data.supports(iface.type_hash)),
            (TypeDescriptor::Enum(_), Value::Enum { type_name, .. }) => type_name == name,
            (
                TypeDescriptor::Struct(_) | TypeDescriptor::Exception(_),
                Value::Struct(s),
            ) => self.struct_conforms(name, s),
            _ => false,
        }
    }

    /// A struct value conforms to its own type and to every base of it.
    fn struct_conforms(&self, declared: &QualifiedName, value: &StructValue) -> bool {
        if !self.derives_from(&value.type_name, declared) {
            return false;
        }
        self.fields_of(&value.type_name).iter().all(|(field, ty)| {
            value
                .field(field)
                .is_none_or(|v| self.conforms(ty, v))
        })
    }

    fn derives_from(&self, name: &QualifiedName, ancestor: &QualifiedName) -> bool {
        let mut current = Some(name.clone());
        let mut steps = 0;
        while let Some(n) = current {
            if &n == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.registry.len() {
                return false;
            }
            current = self
                .registry
                .get(&n)
                .and_then(TypeDescriptor::as_compound)
                .and_then(|c| c.base.clone());
        }
        false
    }

    /// Fields of a struct or exception along its base chain, root first.
    pub(crate) fn fields_of(&self, name: &QualifiedName) -> Vec<(String, TypeRef)> {
        let mut chain = Vec::new();
        let mut current = Some(name.clone());
        while let Some(n) = current {
            let Some(entry) = self.registry.get(&n).and_then(TypeDescriptor::as_compound) else {
                break;
            };
            if chain.len() > self.registry.len() {
                break;
            }
            chain.push(entry);
            current = entry.base.clone();
        }
        chain
            .iter()
            .rev()
            .flat_map(|entry| entry.fields.iter().map(|f| (f.name.clone(), f.ty.clone())))
            .collect()
    }

    /// Zero value of a declared type: out-parameter slots start with this.
    pub(crate) fn default_value(&self, ty: &TypeRef) -> Value {
        let ty = match self.registry.resolve_alias(ty) {
            Ok(ty) => ty,
            Err(_) => return Value::Void,
        };
        match &ty {
            TypeRef::Primitive(kind) => Value::default_for_primitive(*kind),
            TypeRef::Sequence(_) => Value::Sequence(Vec::new()),
            TypeRef::Named(name) => match self.registry.get(name) {
                Some(TypeDescriptor::Enum(e)) => Value::Enum {
                    type_name: name.clone(),
                    value: e.default_value(),
                },
                Some(TypeDescriptor::Struct(_) | TypeDescriptor::Exception(_)) => {
                    Value::Struct(self.default_struct(name))
                }
                _ => Value::Null,
            },
        }
    }

    pub(crate) fn default_struct(&self, name: &QualifiedName) -> StructValue {
        self.fields_of(name)
            .into_iter()
            .fold(StructValue::new(name.clone()), |s, (field, ty)| {
                let value = self.default_value(&ty);
                s.with_field(field, value)
            })
    }

    /// Acquire every object reachable from `values` until the pins drop.
    pub(crate) fn pin_objects<'v>(
        &self,
        values: impl IntoIterator<Item = &'v Value>,
    ) -> Result<Vec<HeapPin<'h>>, ObjectError> {
        let mut pins = Vec::new();
        for value in values {
            for handle in value.object_handles() {
                pins.push(self.heap.pin(handle)?);
            }
        }
        Ok(pins)
    }
}

fn primitive_conforms(kind: PrimitiveKind, value: &Value) -> bool {
    matches!(
        (kind, value),
        (PrimitiveKind::Void, Value::Void)
            | (PrimitiveKind::Boolean, Value::Bool(_))
            | (PrimitiveKind::Byte, Value::Byte(_))
            | (PrimitiveKind::Short, Value::Short(_))
            | (PrimitiveKind::UnsignedShort, Value::UShort(_))
            | (PrimitiveKind::Long, Value::Long(_))
            | (PrimitiveKind::UnsignedLong, Value::ULong(_))
            | (PrimitiveKind::Hyper, Value::Hyper(_))
            | (PrimitiveKind::UnsignedHyper, Value::UHyper(_))
            | (PrimitiveKind::Float, Value::Float(_))
            | (PrimitiveKind::Double, Value::Double(_))
            | (PrimitiveKind::Char, Value::Char(_))
            | (PrimitiveKind::String, Value::String(_))
            | (PrimitiveKind::Type, Value::Type(_))
            | (PrimitiveKind::Any, _)
    )
}
