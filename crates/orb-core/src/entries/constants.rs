//! Constant group entry.

use crate::{ConstantValue, QualifiedName, TypeHash};

/// Registry entry for a group of named constants.
///
/// Members keep declaration order; names are unique within the group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantsEntry {
    /// Fully qualified name.
    pub name: QualifiedName,
    /// Type hash for identity.
    pub type_hash: TypeHash,
    /// Members in declaration order.
    pub values: Vec<(String, ConstantValue)>,
}

impl ConstantsEntry {
    pub fn new(name: impl Into<QualifiedName>) -> Self {
        let name = name.into();
        let type_hash = name.to_type_hash();
        Self {
            name,
            type_hash,
            values: Vec::new(),
        }
    }

    /// Add a constant. A later constant with the same name replaces the earlier one.
    pub fn with_constant(mut self, name: impl Into<String>, value: ConstantValue) -> Self {
        let name = name.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
        self
    }

    /// Look up a constant by name.
    pub fn get(&self, name: &str) -> Option<ConstantValue> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_and_replace() {
        let group = ConstantsEntry::new("orb.awt.FontWeight")
            .with_constant("NORMAL", ConstantValue::float(100.0))
            .with_constant("BOLD", ConstantValue::float(150.0))
            .with_constant("NORMAL", ConstantValue::float(101.0));

        assert_eq!(group.values.len(), 2);
        assert_eq!(group.get("NORMAL"), Some(ConstantValue::float(101.0)));
        assert_eq!(group.get("LIGHT"), None);
    }
}
