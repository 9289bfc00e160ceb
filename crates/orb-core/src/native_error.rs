//! Errors produced by native implementations.
//!
//! Native code reports failures as [`NativeError`]. The runtime never hands
//! these to callers directly: the exception marshaller turns each one into a
//! [`TypedException`](crate::TypedException) resolved against the registry.

use std::fmt;

use thiserror::Error;

use crate::error::ObjectError;
use crate::runtime::Value;
use crate::QualifiedName;

/// Failure converting a [`Value`] to or from a Rust type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("integer overflow: {value} doesn't fit in {target_type}")]
    IntegerOverflow {
        value: i128,
        target_type: &'static str,
    },

    #[error("null handle cannot be converted to {target_type}")]
    NullHandle { target_type: &'static str },
}

/// A structured exception raised by native code.
///
/// `type_name` is matched against registered exception types; unknown names
/// fall back to the runtime error type.
#[derive(Debug, Clone, PartialEq)]
pub struct RaisedException {
    pub type_name: QualifiedName,
    pub message: String,
    pub fields: Vec<(String, Value)>,
}

impl RaisedException {
    pub fn new(type_name: impl Into<QualifiedName>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Set an exception field beyond `Message`.
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.push((name.into(), value));
        self
    }
}

impl fmt::Display for RaisedException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.message)
    }
}

/// Error returned from a native call.
#[derive(Debug, Error)]
pub enum NativeError {
    /// An IDL exception raised on purpose.
    #[error("raised {0}")]
    Raise(RaisedException),

    #[error("conversion error: {0}")]
    Conversion(#[from] ConversionError),

    #[error("argument index {index} out of bounds (count: {count})")]
    ArgumentIndexOutOfBounds { index: usize, count: usize },

    #[error("invalid this: {message}")]
    InvalidThis { message: String },

    #[error(transparent)]
    Object(#[from] ObjectError),

    /// No native code is bound for the called member.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// The native call panicked.
    #[error("native function panicked: {message}")]
    Panic { message: String },

    /// Any other Rust error; matched by registered exception mappers.
    #[error(transparent)]
    Custom(Box<dyn std::error::Error + Send + Sync>),

    #[error("{message}")]
    Other { message: String },
}

impl NativeError {
    /// Raise an exception of the given registered type.
    pub fn raise(type_name: impl Into<QualifiedName>, message: impl Into<String>) -> Self {
        NativeError::Raise(RaisedException::new(type_name, message))
    }

    pub fn invalid_this(message: impl Into<String>) -> Self {
        NativeError::InvalidThis {
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        NativeError::Other {
            message: message.into(),
        }
    }

    /// Wrap an arbitrary Rust error.
    pub fn custom<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        NativeError::Custom(Box::new(error))
    }
}

impl From<RaisedException> for NativeError {
    fn from(raised: RaisedException) -> Self {
        NativeError::Raise(raised)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("disk full")]
    struct DiskFull;

    #[test]
    fn raise_display() {
        let err = NativeError::raise("orb.io.IOException", "closed");
        assert_eq!(err.to_string(), "raised orb.io.IOException: closed");
    }

    #[test]
    fn custom_errors_can_be_downcast() {
        let err = NativeError::custom(DiskFull);
        match err {
            NativeError::Custom(inner) => assert!(inner.downcast_ref::<DiskFull>().is_some()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn conversion_display() {
        let err = ConversionError::IntegerOverflow {
            value: 300,
            target_type: "i8",
        };
        assert_eq!(err.to_string(), "integer overflow: 300 doesn't fit in i8");
    }
}
