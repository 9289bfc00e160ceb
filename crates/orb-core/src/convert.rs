//! Conversion traits for argument extraction and return values.
//!
//! - [`FromValue`]: Extract a Rust value from a [`Value`]
//! - [`IntoValue`]: Convert a Rust value into a [`Value`]
//!
//! Integers convert exactly: a value of any IDL integer width is accepted as
//! long as it fits the target type, so a `short` argument can be read as
//! `i32` but an `unsigned hyper` above `i64::MAX` cannot be read as `i64`.
//!
//! ```
//! use orb_core::{FromValue, IntoValue, Value};
//!
//! let v = 42u16.into_value();
//! assert_eq!(v, Value::UShort(42));
//! assert_eq!(i64::from_value(&v), Ok(42));
//! assert!(i8::from_value(&Value::Long(300)).is_err());
//! ```

use crate::native_error::ConversionError;
use crate::runtime::{ObjectHandle, Value};

/// Extract a value from a [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, ConversionError>;
}

/// Convert a value into a [`Value`].
pub trait IntoValue {
    fn into_value(self) -> Value;
}

fn integer_of(value: &Value) -> Option<i128> {
    match *value {
        Value::Byte(v) => Some(v.into()),
        Value::Short(v) => Some(v.into()),
        Value::UShort(v) => Some(v.into()),
        Value::Long(v) => Some(v.into()),
        Value::ULong(v) => Some(v.into()),
        Value::Hyper(v) => Some(v.into()),
        Value::UHyper(v) => Some(v.into()),
        Value::Enum { value, .. } => Some(value.into()),
        _ => None,
    }
}

// ============================================================================
// Integer implementations
// ============================================================================

macro_rules! impl_integer {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value) -> Result<Self, ConversionError> {
                    let raw = integer_of(value).ok_or(ConversionError::TypeMismatch {
                        expected: stringify!($ty),
                        actual: value.type_name(),
                    })?;
                    <$ty>::try_from(raw).map_err(|_| ConversionError::IntegerOverflow {
                        value: raw,
                        target_type: stringify!($ty),
                    })
                }
            }

            impl IntoValue for $ty {
                fn into_value(self) -> Value {
                    Value::$variant(self)
                }
            }
        )*
    };
}

impl_integer!(
    i8 => Byte,
    i16 => Short,
    u16 => UShort,
    i32 => Long,
    u32 => ULong,
    i64 => Hyper,
    u64 => UHyper,
);

// ============================================================================
// Float implementations
// ============================================================================

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match *value {
            Value::Double(v) => Ok(v),
            Value::Float(v) => Ok(f64::from(v)),
            _ => Err(ConversionError::TypeMismatch {
                expected: "f64",
                actual: value.type_name(),
            }),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match *value {
            Value::Float(v) => Ok(v),
            _ => Err(ConversionError::TypeMismatch {
                expected: "f32",
                actual: value.type_name(),
            }),
        }
    }
}

impl IntoValue for f32 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Double(self)
    }
}

// ============================================================================
// Other primitives
// ============================================================================

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match *value {
            Value::Bool(v) => Ok(v),
            _ => Err(ConversionError::TypeMismatch {
                expected: "bool",
                actual: value.type_name(),
            }),
        }
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl FromValue for char {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match *value {
            Value::Char(v) => Ok(v),
            _ => Err(ConversionError::TypeMismatch {
                expected: "char",
                actual: value.type_name(),
            }),
        }
    }
}

impl IntoValue for char {
    fn into_value(self) -> Value {
        Value::Char(self)
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            _ => Err(ConversionError::TypeMismatch {
                expected: "string",
                actual: value.type_name(),
            }),
        }
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::String(self.to_string())
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::Void
    }
}

// ============================================================================
// Objects, sequences and pass-through
// ============================================================================

impl FromValue for ObjectHandle {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Object(h) => Ok(*h),
            Value::Null => Err(ConversionError::NullHandle {
                target_type: "ObjectHandle",
            }),
            _ => Err(ConversionError::TypeMismatch {
                expected: "object",
                actual: value.type_name(),
            }),
        }
    }
}

impl IntoValue for ObjectHandle {
    fn into_value(self) -> Value {
        Value::Object(self)
    }
}

impl FromValue for Option<ObjectHandle> {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(None),
            other => ObjectHandle::from_value(other).map(Some),
        }
    }
}

impl IntoValue for Option<ObjectHandle> {
    fn into_value(self) -> Value {
        self.map_or(Value::Null, Value::Object)
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Sequence(items) => items.iter().map(T::from_value).collect(),
            _ => Err(ConversionError::TypeMismatch {
                expected: "sequence",
                actual: value.type_name(),
            }),
        }
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::Sequence(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        Ok(value.clone())
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening_integer_reads() {
        assert_eq!(i32::from_value(&Value::Short(-7)), Ok(-7));
        assert_eq!(u64::from_value(&Value::ULong(7)), Ok(7));
    }

    #[test]
    fn narrowing_checks_range() {
        assert!(matches!(
            u32::from_value(&Value::Long(-1)),
            Err(ConversionError::IntegerOverflow { value: -1, .. })
        ));
        assert!(i64::from_value(&Value::UHyper(u64::MAX)).is_err());
        assert_eq!(u64::from_value(&Value::UHyper(u64::MAX)), Ok(u64::MAX));
    }

    #[test]
    fn type_mismatch() {
        assert_eq!(
            bool::from_value(&Value::Long(1)),
            Err(ConversionError::TypeMismatch {
                expected: "bool",
                actual: "long"
            })
        );
    }

    #[test]
    fn sequences() {
        let v = vec![1i32, 2, 3].into_value();
        assert_eq!(
            v,
            Value::Sequence(vec![Value::Long(1), Value::Long(2), Value::Long(3)])
        );
        assert_eq!(Vec::<i32>::from_value(&v), Ok(vec![1, 2, 3]));
    }

    #[test]
    fn optional_handles() {
        assert_eq!(Option::<ObjectHandle>::from_value(&Value::Null), Ok(None));
        assert!(ObjectHandle::from_value(&Value::Null).is_err());
    }
}
