//! Width-tagged constant values.
//!
//! Constant groups carry literals of every integer width, including 64-bit
//! unsigned flag masks that do not fit a signed 32-bit or even signed 64-bit
//! integer. [`ConstantValue`] keeps the declared width and signedness so no
//! value is truncated or reinterpreted on the way through the registry.

use std::fmt;

use ordered_float::OrderedFloat;

use crate::PrimitiveKind;

/// Primitive constant value stored directly in the registry.
///
/// Floats are wrapped in [`OrderedFloat`] so descriptors containing constants
/// can be compared structurally and hashed.
///
/// # Example
///
/// ```
/// use orb_core::ConstantValue;
///
/// let mask = ConstantValue::UnsignedHyper(0x8000_0000_0000_0000);
/// assert_eq!(mask.as_u64(), Some(0x8000_0000_0000_0000));
/// assert_eq!(mask.as_i64(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstantValue {
    Boolean(bool),
    Byte(i8),
    Short(i16),
    UnsignedShort(u16),
    Long(i32),
    UnsignedLong(u32),
    Hyper(i64),
    UnsignedHyper(u64),
    Float(OrderedFloat<f32>),
    Double(OrderedFloat<f64>),
}

impl ConstantValue {
    /// The declared primitive kind of this constant.
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            ConstantValue::Boolean(_) => PrimitiveKind::Boolean,
            ConstantValue::Byte(_) => PrimitiveKind::Byte,
            ConstantValue::Short(_) => PrimitiveKind::Short,
            ConstantValue::UnsignedShort(_) => PrimitiveKind::UnsignedShort,
            ConstantValue::Long(_) => PrimitiveKind::Long,
            ConstantValue::UnsignedLong(_) => PrimitiveKind::UnsignedLong,
            ConstantValue::Hyper(_) => PrimitiveKind::Hyper,
            ConstantValue::UnsignedHyper(_) => PrimitiveKind::UnsignedHyper,
            ConstantValue::Float(_) => PrimitiveKind::Float,
            ConstantValue::Double(_) => PrimitiveKind::Double,
        }
    }

    /// Exact integer value, widened losslessly. `None` for booleans and floats.
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            ConstantValue::Byte(v) => Some(v.into()),
            ConstantValue::Short(v) => Some(v.into()),
            ConstantValue::UnsignedShort(v) => Some(v.into()),
            ConstantValue::Long(v) => Some(v.into()),
            ConstantValue::UnsignedLong(v) => Some(v.into()),
            ConstantValue::Hyper(v) => Some(v.into()),
            ConstantValue::UnsignedHyper(v) => Some(v.into()),
            ConstantValue::Boolean(_) | ConstantValue::Float(_) | ConstantValue::Double(_) => None,
        }
    }

    /// Integer value if it fits in `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_i128().and_then(|v| i64::try_from(v).ok())
    }

    /// Integer value if it is non-negative and fits in `u64`.
    pub fn as_u64(&self) -> Option<u64> {
        self.as_i128().and_then(|v| u64::try_from(v).ok())
    }

    /// Floating point value (integers are not converted).
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            ConstantValue::Float(v) => Some(f64::from(v.0)),
            ConstantValue::Double(v) => Some(v.0),
            _ => None,
        }
    }

    /// Create a float constant.
    pub fn float(v: f32) -> Self {
        ConstantValue::Float(OrderedFloat(v))
    }

    /// Create a double constant.
    pub fn double(v: f64) -> Self {
        ConstantValue::Double(OrderedFloat(v))
    }
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Boolean(v) => write!(f, "{v}"),
            ConstantValue::Byte(v) => write!(f, "{v}"),
            ConstantValue::Short(v) => write!(f, "{v}"),
            ConstantValue::UnsignedShort(v) => write!(f, "{v}"),
            ConstantValue::Long(v) => write!(f, "{v}"),
            ConstantValue::UnsignedLong(v) => write!(f, "{v}"),
            ConstantValue::Hyper(v) => write!(f, "{v}"),
            ConstantValue::UnsignedHyper(v) => write!(f, "{v:#x}"),
            ConstantValue::Float(v) => write!(f, "{}", v.0),
            ConstantValue::Double(v) => write!(f, "{}", v.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_unsigned_is_exact() {
        let v = ConstantValue::UnsignedHyper(u64::MAX);
        assert_eq!(v.as_u64(), Some(u64::MAX));
        assert_eq!(v.as_i64(), None);
        assert_eq!(v.kind(), PrimitiveKind::UnsignedHyper);
    }

    #[test]
    fn negative_has_no_unsigned_view() {
        let v = ConstantValue::Hyper(-1);
        assert_eq!(v.as_i64(), Some(-1));
        assert_eq!(v.as_u64(), None);
    }

    #[test]
    fn floats_compare_structurally() {
        assert_eq!(ConstantValue::double(1.5), ConstantValue::double(1.5));
        assert_ne!(ConstantValue::double(1.5), ConstantValue::float(1.5));
        assert_eq!(ConstantValue::float(2.0).as_f64(), Some(2.0));
        assert_eq!(ConstantValue::Long(2).as_f64(), None);
    }
}
