//! Enum type entry.
//!
//! This module provides `EnumEntry` for enumeration types.

use crate::{QualifiedName, TypeHash};

/// A named enum member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub name: String,
    pub value: i32,
}

impl EnumValue {
    pub fn new(name: impl Into<String>, value: i32) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Registry entry for an enumeration type.
///
/// Values are 32-bit and need be neither contiguous nor unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumEntry {
    /// Fully qualified name.
    pub name: QualifiedName,
    /// Type hash for identity.
    pub type_hash: TypeHash,
    /// Members in declaration order.
    pub values: Vec<EnumValue>,
}

impl EnumEntry {
    pub fn new(name: impl Into<QualifiedName>) -> Self {
        let name = name.into();
        let type_hash = name.to_type_hash();
        Self {
            name,
            type_hash,
            values: Vec::new(),
        }
    }

    /// Add a value to the enum.
    pub fn with_value(mut self, name: impl Into<String>, value: i32) -> Self {
        self.values.push(EnumValue::new(name, value));
        self
    }

    /// Look up a value by name.
    pub fn get_value(&self, name: &str) -> Option<i32> {
        self.values.iter().find(|v| v.name == name).map(|v| v.value)
    }

    /// First member name carrying `value`.
    pub fn get_name(&self, value: i32) -> Option<&str> {
        self.values
            .iter()
            .find(|v| v.value == value)
            .map(|v| v.name.as_str())
    }

    /// Value of the first member, the default for fresh slots.
    pub fn default_value(&self) -> i32 {
        self.values.first().map(|v| v.value).unwrap_or(0)
    }
}
