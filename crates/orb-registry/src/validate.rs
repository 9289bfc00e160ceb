//! Cross-type validation.
//!
//! Registration only checks a descriptor on its own. Once a batch of types is
//! in, [`TypeRegistry::validate`] checks that everything they refer to exists,
//! has a kind that fits the reference, and that no inheritance or alias chain
//! loops back on itself.

use rustc_hash::FxHashSet;

use orb_core::entries::ReferenceRole;
use orb_core::{QualifiedName, RegistrationError, TypeDescriptor, TypeKind};

use crate::TypeRegistry;

/// Kinds a reference in `role` from a type of kind `owner` may point at.
fn expected_kinds(owner: TypeKind, role: ReferenceRole) -> &'static [TypeKind] {
    match (owner, role) {
        (TypeKind::Interface, ReferenceRole::Base) => &[TypeKind::Interface],
        (TypeKind::Struct, ReferenceRole::Base) => &[TypeKind::Struct],
        (TypeKind::Exception, ReferenceRole::Base) => &[TypeKind::Exception],
        (_, ReferenceRole::Raises) => &[TypeKind::Exception],
        (_, ReferenceRole::Implements) => &[TypeKind::Interface],
        _ => &[
            TypeKind::Interface,
            TypeKind::Struct,
            TypeKind::Enum,
            TypeKind::Exception,
            TypeKind::Typedef,
        ],
    }
}

impl TypeRegistry {
    /// Validate the named types against the rest of the registry.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn validate(&self, names: &[QualifiedName]) -> Result<(), RegistrationError> {
        for name in names {
            let desc = self.resolve(name)?;
            self.check_references(&desc)?;
            self.check_cycles(&desc)?;
        }
        Ok(())
    }

    /// Validate every registered type.
    pub fn validate_all(&self) -> Result<(), RegistrationError> {
        let mut names: Vec<QualifiedName> = self.iter().map(|d| d.name().clone()).collect();
        names.sort();
        self.validate(&names)
    }

    fn check_references(&self, desc: &TypeDescriptor) -> Result<(), RegistrationError> {
        for reference in desc.references() {
            let target = self.get(reference.name).ok_or_else(|| {
                log::debug!("{} refers to unknown type {}", desc.name(), reference.name);
                RegistrationError::UnknownType(reference.name.to_string())
            })?;
            let allowed = expected_kinds(desc.kind(), reference.role);
            if !allowed.contains(&target.kind()) {
                return Err(RegistrationError::invalid_type(
                    desc.name(),
                    format!(
                        "{} is a {}, which cannot be used as {}",
                        reference.name,
                        target.kind(),
                        role_text(reference.role)
                    ),
                ));
            }
        }
        Ok(())
    }

    fn check_cycles(&self, desc: &TypeDescriptor) -> Result<(), RegistrationError> {
        match desc {
            TypeDescriptor::Interface(_) => {
                let mut visiting = Vec::new();
                let mut done = FxHashSet::default();
                self.check_interface_acyclic(desc.name(), &mut visiting, &mut done)
            }
            TypeDescriptor::Struct(_) | TypeDescriptor::Exception(_) => {
                let mut seen = FxHashSet::default();
                let mut current = Some(desc.name().clone());
                while let Some(name) = current {
                    if !seen.insert(name.clone()) {
                        return Err(RegistrationError::invalid_type(
                            desc.name(),
                            "cyclic inheritance",
                        ));
                    }
                    current = self
                        .get(&name)
                        .and_then(TypeDescriptor::as_compound)
                        .and_then(|c| c.base.clone());
                }
                Ok(())
            }
            TypeDescriptor::Typedef(alias) => self.resolve_alias(&alias.target).map(|_| ()),
            _ => Ok(()),
        }
    }

    fn check_interface_acyclic(
        &self,
        name: &QualifiedName,
        visiting: &mut Vec<QualifiedName>,
        done: &mut FxHashSet<QualifiedName>,
    ) -> Result<(), RegistrationError> {
        if done.contains(name) {
            return Ok(());
        }
        if visiting.contains(name) {
            return Err(RegistrationError::invalid_type(name, "cyclic inheritance"));
        }
        visiting.push(name.clone());
        if let Some(iface) = self.get(name).and_then(TypeDescriptor::as_interface) {
            for base in &iface.bases {
                self.check_interface_acyclic(base, visiting, done)?;
            }
        }
        visiting.pop();
        done.insert(name.clone());
        Ok(())
    }
}

fn role_text(role: ReferenceRole) -> &'static str {
    match role {
        ReferenceRole::Base => "a base",
        ReferenceRole::Raises => "a raised exception",
        ReferenceRole::Member => "a member type",
        ReferenceRole::Implements => "an implemented interface",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orb_core::{
        EnumEntry, InterfaceEntry, MethodSignature, ModuleId, PrimitiveKind, ServiceEntry,
        StructEntry, TypeRef,
    };

    fn registry_with(descs: Vec<TypeDescriptor>) -> TypeRegistry {
        let mut registry = TypeRegistry::with_builtins();
        for desc in descs {
            registry.register(desc, ModuleId::HOST).unwrap();
        }
        registry
    }

    #[test]
    fn builtins_validate() {
        assert_eq!(TypeRegistry::with_builtins().validate_all(), Ok(()));
    }

    #[test]
    fn missing_reference_is_unknown_type() {
        let registry = registry_with(vec![
            InterfaceEntry::new("test.XFoo")
                .with_method(MethodSignature::new("get", TypeRef::named("test.Missing")))
                .into(),
        ]);
        assert_eq!(
            registry.validate(&["test.XFoo".into()]),
            Err(RegistrationError::UnknownType("test.Missing".into()))
        );
    }

    #[test]
    fn raises_must_name_an_exception() {
        let registry = registry_with(vec![
            EnumEntry::new("test.Color").with_value("RED", 0).into(),
            InterfaceEntry::new("test.XFoo")
                .with_method(MethodSignature::new("paint", TypeRef::VOID).raises("test.Color"))
                .into(),
        ]);
        assert!(matches!(
            registry.validate(&["test.XFoo".into()]),
            Err(RegistrationError::InvalidType { .. })
        ));
    }

    #[test]
    fn service_must_implement_an_interface() {
        let registry = registry_with(vec![
            StructEntry::new("test.Point").into(),
            ServiceEntry::new("test.Points").implementing("test.Point").into(),
        ]);
        assert!(registry.validate(&["test.Points".into()]).is_err());
    }

    #[test]
    fn interface_cycle_is_rejected() {
        let registry = registry_with(vec![
            InterfaceEntry::new("test.XA").with_base("test.XB").into(),
            InterfaceEntry::new("test.XB").with_base("test.XA").into(),
        ]);
        let err = registry.validate(&["test.XA".into()]).unwrap_err();
        assert!(err.to_string().contains("cyclic inheritance"));
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let registry = registry_with(vec![
            InterfaceEntry::new("test.XTop").into(),
            InterfaceEntry::new("test.XLeft").with_base("test.XTop").into(),
            InterfaceEntry::new("test.XRight").with_base("test.XTop").into(),
            InterfaceEntry::new("test.XBottom")
                .with_base("test.XLeft")
                .with_base("test.XRight")
                .into(),
        ]);
        assert_eq!(registry.validate_all(), Ok(()));
    }

    #[test]
    fn struct_base_must_be_struct() {
        let registry = registry_with(vec![
            StructEntry::new("test.Point")
                .with_base("orb.Exception")
                .with_field("X", PrimitiveKind::Long.into())
                .into(),
        ]);
        assert!(registry.validate(&["test.Point".into()]).is_err());
    }
}
