//! Generic argument and result values.

use std::fmt;

use crate::{ConstantValue, PrimitiveKind, QualifiedName, TypeRef};

use super::ObjectHandle;

/// A value crossing the dispatch layer.
///
/// Every primitive is carried by value at its declared width. Sequences,
/// structs and `any` own their contents; enums and structs carry their type
/// name so conformance can be checked without a side channel. Object
/// references are heap handles and do not own a count by themselves.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value (void returns, unset out parameters).
    #[default]
    Void,
    Bool(bool),
    Byte(i8),
    Short(i16),
    UShort(u16),
    Long(i32),
    ULong(u32),
    Hyper(i64),
    UHyper(u64),
    Float(f32),
    Double(f64),
    Char(char),
    String(String),
    /// A type reference (`type`).
    Type(TypeRef),
    /// A boxed value of any type (`any`).
    Any(Box<Value>),
    Sequence(Vec<Value>),
    Enum {
        type_name: QualifiedName,
        value: i32,
    },
    Struct(StructValue),
    Object(ObjectHandle),
    /// Null object reference.
    Null,
}

impl Value {
    /// Short name of the value's shape, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Void => "void",
            Value::Bool(_) => "boolean",
            Value::Byte(_) => "byte",
            Value::Short(_) => "short",
            Value::UShort(_) => "unsigned short",
            Value::Long(_) => "long",
            Value::ULong(_) => "unsigned long",
            Value::Hyper(_) => "hyper",
            Value::UHyper(_) => "unsigned hyper",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Char(_) => "char",
            Value::String(_) => "string",
            Value::Type(_) => "type",
            Value::Any(_) => "any",
            Value::Sequence(_) => "sequence",
            Value::Enum { .. } => "enum",
            Value::Struct(_) => "struct",
            Value::Object(_) => "object",
            Value::Null => "null",
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Value::Void)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The object handle, if this is an object reference.
    pub fn as_object(&self) -> Option<ObjectHandle> {
        match self {
            Value::Object(h) => Some(*h),
            _ => None,
        }
    }

    /// Wrap in `any`.
    pub fn boxed(self) -> Value {
        Value::Any(Box::new(self))
    }

    /// Zero value of a primitive kind.
    pub fn default_for_primitive(kind: PrimitiveKind) -> Value {
        match kind {
            PrimitiveKind::Void => Value::Void,
            PrimitiveKind::Boolean => Value::Bool(false),
            PrimitiveKind::Byte => Value::Byte(0),
            PrimitiveKind::Short => Value::Short(0),
            PrimitiveKind::UnsignedShort => Value::UShort(0),
            PrimitiveKind::Long => Value::Long(0),
            PrimitiveKind::UnsignedLong => Value::ULong(0),
            PrimitiveKind::Hyper => Value::Hyper(0),
            PrimitiveKind::UnsignedHyper => Value::UHyper(0),
            PrimitiveKind::Float => Value::Float(0.0),
            PrimitiveKind::Double => Value::Double(0.0),
            PrimitiveKind::Char => Value::Char('\0'),
            PrimitiveKind::String => Value::String(String::new()),
            PrimitiveKind::Type => Value::Type(TypeRef::VOID),
            PrimitiveKind::Any => Value::Any(Box::new(Value::Void)),
        }
    }

    /// Every object handle reachable from this value, including nested ones.
    pub fn object_handles(&self) -> Vec<ObjectHandle> {
        let mut out = Vec::new();
        self.collect_handles(&mut out);
        out
    }

    fn collect_handles(&self, out: &mut Vec<ObjectHandle>) {
        match self {
            Value::Object(h) => out.push(*h),
            Value::Any(inner) => inner.collect_handles(out),
            Value::Sequence(items) => items.iter().for_each(|v| v.collect_handles(out)),
            Value::Struct(s) => s.fields.iter().for_each(|(_, v)| v.collect_handles(out)),
            _ => {}
        }
    }
}

impl From<ConstantValue> for Value {
    fn from(c: ConstantValue) -> Self {
        match c {
            ConstantValue::Boolean(v) => Value::Bool(v),
            ConstantValue::Byte(v) => Value::Byte(v),
            ConstantValue::Short(v) => Value::Short(v),
            ConstantValue::UnsignedShort(v) => Value::UShort(v),
            ConstantValue::Long(v) => Value::Long(v),
            ConstantValue::UnsignedLong(v) => Value::ULong(v),
            ConstantValue::Hyper(v) => Value::Hyper(v),
            ConstantValue::UnsignedHyper(v) => Value::UHyper(v),
            ConstantValue::Float(v) => Value::Float(v.0),
            ConstantValue::Double(v) => Value::Double(v.0),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => write!(f, "void"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Byte(v) => write!(f, "{v}"),
            Value::Short(v) => write!(f, "{v}"),
            Value::UShort(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::ULong(v) => write!(f, "{v}"),
            Value::Hyper(v) => write!(f, "{v}"),
            Value::UHyper(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Char(v) => write!(f, "{v:?}"),
            Value::String(v) => write!(f, "{v:?}"),
            Value::Type(t) => write!(f, "type {t}"),
            Value::Any(v) => write!(f, "any({v})"),
            Value::Sequence(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Enum { type_name, value } => write!(f, "{type_name}({value})"),
            Value::Struct(s) => write!(f, "{s}"),
            Value::Object(h) => write!(f, "object#{}.{}", h.index, h.generation),
            Value::Null => write!(f, "null"),
        }
    }
}

/// A struct or exception value with its fields in layout order.
#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
    pub type_name: QualifiedName,
    pub fields: Vec<(String, Value)>,
}

impl StructValue {
    pub fn new(type_name: impl Into<QualifiedName>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set_field(name, value);
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Replace a field's value, appending it if absent.
    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }
}

impl fmt::Display for StructValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.type_name)?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, " {name}: {value}")?;
        }
        write!(f, " }}")
    }
}

impl From<StructValue> for Value {
    fn from(s: StructValue) -> Self {
        Value::Struct(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TypeHash;

    #[test]
    fn type_names() {
        assert_eq!(Value::Void.type_name(), "void");
        assert_eq!(Value::UHyper(1).type_name(), "unsigned hyper");
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::Sequence(vec![]).type_name(), "sequence");
    }

    #[test]
    fn constants_keep_width() {
        assert_eq!(
            Value::from(ConstantValue::UnsignedHyper(u64::MAX)),
            Value::UHyper(u64::MAX)
        );
        assert_eq!(Value::from(ConstantValue::Short(-3)), Value::Short(-3));
    }

    #[test]
    fn nested_handles_are_collected() {
        let a = ObjectHandle::new(1, 0, TypeHash::from_name("orb.XA"));
        let b = ObjectHandle::new(2, 3, TypeHash::from_name("orb.XB"));
        let value = Value::Sequence(vec![
            Value::Object(a),
            Value::Struct(StructValue::new("orb.Pair").with_field("Second", Value::Object(b).boxed())),
            Value::Null,
        ]);
        assert_eq!(value.object_handles(), vec![a, b]);
    }

    #[test]
    fn struct_value_fields() {
        let mut s = StructValue::new("orb.awt.Point")
            .with_field("X", Value::Long(1))
            .with_field("Y", Value::Long(2));
        s.set_field("X", Value::Long(5));
        assert_eq!(s.field("X"), Some(&Value::Long(5)));
        assert_eq!(s.fields.len(), 2);
        assert_eq!(s.to_string(), "orb.awt.Point { X: 5, Y: 2 }");
    }
}
