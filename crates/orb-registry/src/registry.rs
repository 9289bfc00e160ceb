//! TypeRegistry - canonical type descriptions keyed by qualified name.
//!
//! # Storage Model
//!
//! - **Types**: every descriptor in one flat map by [`QualifiedName`], stored
//!   behind `Arc` so lookups hand out cheap clones.
//! - **Hash index**: `TypeHash -> QualifiedName` for hash-based lookups.
//! - **Owners**: which modules registered each entry. Identical registrations
//!   from several modules share one entry, which lives until its last owner
//!   unloads.
//! - **Namespace tree**: a [`NamespaceTree`] mirror for ordered enumeration
//!   and export.
//!
//! # Thread Safety
//!
//! `TypeRegistry` is not synchronised itself; the runtime wraps it in a
//! read/write lock so resolution only ever takes the read side.
//!
//! # Example
//!
//! ```
//! use orb_core::{EnumEntry, ModuleId, QualifiedName};
//! use orb_registry::TypeRegistry;
//!
//! let mut registry = TypeRegistry::with_builtins();
//! let color = EnumEntry::new("test.Color").with_value("RED", 0);
//! registry.register(color.into(), ModuleId::HOST).unwrap();
//!
//! let name = QualifiedName::from("test.Color.RED");
//! assert_eq!(registry.resolve_constant(&name).unwrap().as_i64(), Some(0));
//! ```

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use orb_core::{
    ConstantValue, ModuleId, ParamDirection, QualifiedName, RegistrationError, TypeDescriptor,
    TypeHash, TypeRef,
};

use crate::builtins;
use crate::namespace_tree::NamespaceTree;

/// Canonical store of type descriptors.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    /// Descriptors by qualified name (primary storage).
    types: FxHashMap<QualifiedName, Arc<TypeDescriptor>>,

    /// Reverse index: hash -> name.
    hash_index: FxHashMap<TypeHash, QualifiedName>,

    /// Modules that registered each entry, in registration order.
    owners: FxHashMap<QualifiedName, Vec<ModuleId>>,

    /// Hierarchical view.
    tree: NamespaceTree,
}

impl TypeRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in interface and exception types.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for desc in builtins::descriptors() {
            if let Err(e) = registry.register(desc, ModuleId::BUILTIN) {
                log::error!("registering built-in type: {e}");
            }
        }
        registry
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    /// Register a descriptor on behalf of `owner`.
    ///
    /// Registering a payload identical to the existing one adds `owner` to the
    /// entry and returns it unchanged. A differing payload is rejected with
    /// `DuplicateType` and the existing entry is left intact.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn register(
        &mut self,
        desc: TypeDescriptor,
        owner: ModuleId,
    ) -> Result<Arc<TypeDescriptor>, RegistrationError> {
        let name = desc.name().clone();

        if let Some(existing) = self.types.get(&name) {
            if **existing != desc {
                log::debug!("rejected conflicting registration of {name}");
                return Err(RegistrationError::DuplicateType {
                    name: name.to_string(),
                });
            }
            let existing = Arc::clone(existing);
            let owners = self.owners.entry(name).or_default();
            if !owners.contains(&owner) {
                owners.push(owner);
            }
            return Ok(existing);
        }

        check_well_formed(&desc)?;

        let hash = desc.type_hash();
        if let Some(other) = self.hash_index.get(&hash) {
            return Err(RegistrationError::invalid_type(
                &name,
                format!("type hash collides with {other}"),
            ));
        }

        log::debug!("registered {} {name} ({owner})", desc.kind());
        let desc = Arc::new(desc);
        self.hash_index.insert(hash, name.clone());
        self.tree.insert_type(&name, desc.kind());
        self.owners.insert(name.clone(), vec![owner]);
        self.types.insert(name, Arc::clone(&desc));
        Ok(desc)
    }

    /// Register several descriptors, all or nothing.
    ///
    /// On failure every entry this call added (or added `owner` to) is rolled
    /// back before the error is returned.
    pub fn register_all(
        &mut self,
        descs: impl IntoIterator<Item = TypeDescriptor>,
        owner: ModuleId,
    ) -> Result<Vec<QualifiedName>, RegistrationError> {
        let mut added: Vec<QualifiedName> = Vec::new();
        for desc in descs {
            let name = desc.name().clone();
            let already_owned = self.is_owned_by(&name, owner);
            match self.register(desc, owner) {
                Ok(_) => {
                    if !already_owned {
                        added.push(name);
                    }
                }
                Err(e) => {
                    for name in added.iter().rev() {
                        self.disown(name, owner);
                    }
                    return Err(e);
                }
            }
        }
        Ok(added)
    }

    /// Drop `owner`'s claim on every entry; entries left without owners are removed.
    ///
    /// Returns the names that were removed from the registry.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn unregister_module(&mut self, owner: ModuleId) -> Vec<QualifiedName> {
        let owned: Vec<QualifiedName> = self
            .owners
            .iter()
            .filter(|(_, mods)| mods.contains(&owner))
            .map(|(name, _)| name.clone())
            .collect();

        let mut removed: Vec<QualifiedName> = owned
            .into_iter()
            .filter(|name| self.disown(name, owner))
            .collect();
        removed.sort();
        log::debug!("{owner} unregistered {} types", removed.len());
        removed
    }

    /// Returns true if the entry was removed.
    fn disown(&mut self, name: &QualifiedName, owner: ModuleId) -> bool {
        let Some(mods) = self.owners.get_mut(name) else {
            return false;
        };
        mods.retain(|m| *m != owner);
        if !mods.is_empty() {
            return false;
        }
        self.owners.remove(name);
        if let Some(desc) = self.types.remove(name) {
            self.hash_index.remove(&desc.type_hash());
        }
        self.tree.remove_type(name);
        true
    }

    fn is_owned_by(&self, name: &QualifiedName, owner: ModuleId) -> bool {
        self.owners.get(name).is_some_and(|m| m.contains(&owner))
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    /// Resolve a type by qualified name.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn resolve(&self, name: &QualifiedName) -> Result<Arc<TypeDescriptor>, RegistrationError> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| RegistrationError::UnknownType(name.to_string()))
    }

    /// Borrow a descriptor without cloning the `Arc`.
    pub fn get(&self, name: &QualifiedName) -> Option<&TypeDescriptor> {
        self.types.get(name).map(Arc::as_ref)
    }

    /// Resolve a type by hash.
    pub fn resolve_hash(&self, hash: TypeHash) -> Option<Arc<TypeDescriptor>> {
        self.hash_index
            .get(&hash)
            .and_then(|name| self.types.get(name))
            .cloned()
    }

    pub fn contains(&self, name: &QualifiedName) -> bool {
        self.types.contains_key(name)
    }

    /// Resolve `Group.MEMBER` to a constant value.
    ///
    /// Works for constant groups and for enum members (as `long`).
    pub fn resolve_constant(&self, name: &QualifiedName) -> Result<ConstantValue, RegistrationError> {
        let group_name = name
            .parent()
            .ok_or_else(|| RegistrationError::UnknownType(name.to_string()))?;
        let group = self
            .types
            .get(&group_name)
            .ok_or_else(|| RegistrationError::UnknownType(group_name.to_string()))?;
        let member = name.simple_name();
        let unknown = || RegistrationError::UnknownConstant {
            group: group_name.to_string(),
            member: member.to_string(),
        };
        match group.as_ref() {
            TypeDescriptor::Constants(c) => c.get(member).ok_or_else(unknown),
            TypeDescriptor::Enum(e) => e.get_value(member).map(ConstantValue::Long).ok_or_else(unknown),
            other => Err(RegistrationError::invalid_type(
                &group_name,
                format!("{} has no constants", other.kind()),
            )),
        }
    }

    /// Follow typedefs until a non-alias type is reached.
    pub fn resolve_alias(&self, ty: &TypeRef) -> Result<TypeRef, RegistrationError> {
        let mut current = ty.clone();
        let mut seen: FxHashSet<QualifiedName> = FxHashSet::default();
        while let TypeRef::Named(name) = &current {
            let Some(TypeDescriptor::Typedef(alias)) = self.get(name) else {
                break;
            };
            if !seen.insert(name.clone()) {
                return Err(RegistrationError::invalid_type(name, "cyclic typedef"));
            }
            current = alias.target.clone();
        }
        Ok(current)
    }

    // ==========================================================================
    // Hierarchy queries
    // ==========================================================================

    /// The interface and all interfaces it inherits, each once, self first.
    pub fn interface_closure(&self, name: &QualifiedName) -> Result<Vec<QualifiedName>, RegistrationError> {
        let mut out = Vec::new();
        let mut seen = FxHashSet::default();
        let mut stack = vec![name.clone()];
        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            let desc = self.resolve(&current)?;
            let iface = desc.as_interface().ok_or_else(|| {
                RegistrationError::invalid_type(&current, "not an interface")
            })?;
            stack.extend(iface.bases.iter().rev().cloned());
            out.push(current);
        }
        Ok(out)
    }

    /// Exception chain of `name`, root first (`orb.Exception` ... `name`).
    pub fn exception_chain(
        &self,
        name: &QualifiedName,
    ) -> Result<Vec<Arc<TypeDescriptor>>, RegistrationError> {
        let mut chain = Vec::new();
        let mut seen = FxHashSet::default();
        let mut current = Some(name.clone());
        while let Some(n) = current {
            if !seen.insert(n.clone()) {
                return Err(RegistrationError::invalid_type(&n, "cyclic exception chain"));
            }
            let desc = self.resolve(&n)?;
            let entry = desc
                .as_exception()
                .ok_or_else(|| RegistrationError::invalid_type(&n, "not an exception"))?;
            current = entry.base.clone();
            chain.push(desc);
        }
        chain.reverse();
        Ok(chain)
    }

    /// Whether exception `name` is `ancestor` or derives from it.
    pub fn is_exception_subtype(&self, name: &QualifiedName, ancestor: &QualifiedName) -> bool {
        self.exception_chain(name)
            .is_ok_and(|chain| chain.iter().any(|d| d.name() == ancestor))
    }

    // ==========================================================================
    // Iteration
    // ==========================================================================

    /// Iterate over all descriptors (unordered).
    pub fn iter(&self) -> impl Iterator<Item = &Arc<TypeDescriptor>> {
        self.types.values()
    }

    /// Names owned by `owner`, sorted.
    pub fn names_owned_by(&self, owner: ModuleId) -> Vec<QualifiedName> {
        let mut names: Vec<QualifiedName> = self
            .owners
            .iter()
            .filter(|(_, mods)| mods.contains(&owner))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Modules that registered `name`.
    pub fn owners_of(&self, name: &QualifiedName) -> &[ModuleId] {
        self.owners.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn tree(&self) -> &NamespaceTree {
        &self.tree
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Structural checks that need no other type.
fn check_well_formed(desc: &TypeDescriptor) -> Result<(), RegistrationError> {
    let name = desc.name();
    if name.simple_name().is_empty() {
        return Err(RegistrationError::invalid_type(name, "empty name"));
    }
    match desc {
        TypeDescriptor::Interface(iface) => {
            for m in iface.methods.iter().filter(|m| m.is_oneway()) {
                if !m.return_type.is_void() || m.params.iter().any(|p| p.direction.writes()) {
                    return Err(RegistrationError::invalid_type(
                        name,
                        format!("oneway method '{}' must return void and take only in parameters", m.name),
                    ));
                }
            }
            check_unique(name, "attribute", iface.attributes.iter().map(|a| a.name.as_str()))
        }
        TypeDescriptor::Struct(s) | TypeDescriptor::Exception(s) => {
            check_unique(name, "field", s.fields.iter().map(|f| f.name.as_str()))
        }
        TypeDescriptor::Enum(e) => check_unique(name, "member", e.values.iter().map(|v| v.name.as_str())),
        TypeDescriptor::Service(svc) | TypeDescriptor::Singleton(svc) => {
            let bad = svc
                .constructors
                .iter()
                .find(|c| c.params.iter().any(|p| p.direction != ParamDirection::In));
            match bad {
                Some(c) => Err(RegistrationError::invalid_type(
                    name,
                    format!("constructor '{}' takes non-in parameters", c.name),
                )),
                None => Ok(()),
            }
        }
        TypeDescriptor::Constants(_) | TypeDescriptor::Typedef(_) | TypeDescriptor::Module(_) => {
            Ok(())
        }
    }
}

fn check_unique<'a>(
    owner: &QualifiedName,
    what: &str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), RegistrationError> {
    let mut seen = FxHashSet::default();
    for n in names {
        if !seen.insert(n) {
            return Err(RegistrationError::invalid_type(owner, format!("duplicate {what} '{n}'")));
        }
    }
    Ok(())
}
