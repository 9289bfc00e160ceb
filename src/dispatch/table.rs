//! Dispatch tables: the ordered slot list of an interface.
//!
//! # Slot Order
//!
//! An interface's effective member list is its own members (declared methods,
//! then attribute accessors) followed by each base interface's effective list
//! in declared base order. A member that appears again later in the list with
//! a compatible signature is dropped at the later position, so a diamond
//! contributes its shared root once. The same name with an incompatible
//! signature is an `AmbiguousMethod` error and no table is built. A kept slot
//! raises everything any of the declarations merged into it raises.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rustc_hash::{FxHashMap, FxHashSet};

use orb_core::entries::MemberKind;
use orb_core::{DispatchError, MethodSignature, OrbError, QualifiedName, TypeHash};
use orb_registry::TypeRegistry;

/// One callable entry of a dispatch table.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchSlot {
    pub index: usize,
    /// Interface that declares the member.
    pub declared_in: QualifiedName,
    pub kind: MemberKind,
    pub signature: MethodSignature,
    /// `TypeHash::from_method(declared_in, name)`.
    pub id: TypeHash,
}

/// Ordered, immutable method table for one interface.
///
/// Tables are cached by the runtime. Unloading a module that owned any type
/// the table was built from marks the table stale; invoking through a stale
/// table fails with `StaleTable`.
#[derive(Debug)]
pub struct DispatchTable {
    interface: QualifiedName,
    type_hash: TypeHash,
    slots: Vec<DispatchSlot>,
    dependencies: FxHashSet<QualifiedName>,
    valid: AtomicBool,
}

impl DispatchTable {
    /// Build the table for `interface`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn build(registry: &TypeRegistry, interface: &QualifiedName) -> Result<Self, OrbError> {
        let desc = registry.resolve(interface)?;
        let iface = desc
            .as_interface()
            .ok_or_else(|| DispatchError::NotAnInterface(interface.to_string()))?;

        let mut builder = Builder {
            registry,
            root: interface,
            memo: FxHashMap::default(),
            dependencies: FxHashSet::default(),
        };
        let members = builder.effective(interface, &mut Vec::new())?;

        let slots = members
            .into_iter()
            .enumerate()
            .map(|(index, m)| DispatchSlot {
                index,
                id: TypeHash::from_method(m.declared_in.to_type_hash(), &m.signature.name),
                declared_in: m.declared_in,
                kind: m.kind,
                signature: m.signature,
            })
            .collect::<Vec<_>>();

        log::debug!("built dispatch table for {interface} ({} slots)", slots.len());
        Ok(Self {
            interface: interface.clone(),
            type_hash: iface.type_hash,
            slots,
            dependencies: builder.dependencies,
            valid: AtomicBool::new(true),
        })
    }

    pub fn interface(&self) -> &QualifiedName {
        &self.interface
    }

    pub fn type_hash(&self) -> TypeHash {
        self.type_hash
    }

    pub fn slots(&self) -> &[DispatchSlot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Result<&DispatchSlot, DispatchError> {
        self.slots.get(index).ok_or(DispatchError::SlotOutOfRange {
            index,
            count: self.slots.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot index of the first member named `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.signature.name == name)
    }

    /// Method names in slot order.
    pub fn method_names(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.signature.name.as_str()).collect()
    }

    /// Interfaces the table was built from.
    pub fn depends_on(&self, name: &QualifiedName) -> bool {
        self.dependencies.contains(name)
    }

    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    pub(crate) fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }

    pub(crate) fn ensure_valid(&self) -> Result<(), DispatchError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(DispatchError::StaleTable {
                interface: self.interface.to_string(),
            })
        }
    }
}

#[derive(Debug, Clone)]
struct Member {
    declared_in: QualifiedName,
    kind: MemberKind,
    signature: MethodSignature,
}

struct Builder<'a> {
    registry: &'a TypeRegistry,
    root: &'a QualifiedName,
    memo: FxHashMap<QualifiedName, Vec<Member>>,
    dependencies: FxHashSet<QualifiedName>,
}

impl Builder<'_> {
    fn effective(
        &mut self,
        name: &QualifiedName,
        path: &mut Vec<QualifiedName>,
    ) -> Result<Vec<Member>, OrbError> {
        if path.contains(name) {
            return Err(DispatchError::CyclicInheritance {
                interface: name.to_string(),
            }
            .into());
        }
        if let Some(done) = self.memo.get(name) {
            return Ok(done.clone());
        }

        let desc = self.registry.resolve(name)?;
        let iface = desc
            .as_interface()
            .ok_or_else(|| DispatchError::NotAnInterface(name.to_string()))?;
        self.dependencies.insert(name.clone());

        let mut members: Vec<Member> = iface
            .own_members()
            .into_iter()
            .map(|(kind, signature)| Member {
                declared_in: name.clone(),
                kind,
                signature,
            })
            .collect();

        path.push(name.clone());
        for base in &iface.bases {
            let inherited = self.effective(base, path)?;
            members.extend(inherited);
        }
        path.pop();

        let members = self.dedup(members)?;
        self.memo.insert(name.clone(), members.clone());
        Ok(members)
    }

    fn dedup(&self, members: Vec<Member>) -> Result<Vec<Member>, OrbError> {
        let mut seen: FxHashMap<String, usize> = FxHashMap::default();
        let mut out: Vec<Member> = Vec::with_capacity(members.len());
        for member in members {
            match seen.get(&member.signature.name) {
                Some(&at) if out[at].signature.is_compatible_with(&member.signature) => {
                    let kept = &mut out[at].signature.raises;
                    for raised in member.signature.raises {
                        if !kept.contains(&raised) {
                            kept.push(raised);
                        }
                    }
                }
                Some(_) => {
                    return Err(DispatchError::AmbiguousMethod {
                        interface: self.root.to_string(),
                        method: member.signature.name.clone(),
                    }
                    .into());
                }
                None => {
                    seen.insert(member.signature.name.clone(), out.len());
                    out.push(member);
                }
            }
        }
        Ok(out)
    }
}

/// Cache of built tables, keyed by interface name.
#[derive(Debug, Default)]
pub(crate) struct DispatchCache {
    tables: parking_lot::RwLock<FxHashMap<QualifiedName, Arc<DispatchTable>>>,
}

impl DispatchCache {
    pub(crate) fn get_or_build(
        &self,
        registry: &TypeRegistry,
        interface: &QualifiedName,
    ) -> Result<Arc<DispatchTable>, OrbError> {
        if let Some(table) = self.tables.read().get(interface) {
            return Ok(Arc::clone(table));
        }
        let table = Arc::new(DispatchTable::build(registry, interface)?);
        let mut tables = self.tables.write();
        let entry = tables
            .entry(interface.clone())
            .or_insert_with(|| Arc::clone(&table));
        Ok(Arc::clone(entry))
    }

    /// Mark stale and drop every table built from any of `removed`.
    pub(crate) fn invalidate(&self, removed: &[QualifiedName]) -> usize {
        let mut tables = self.tables.write();
        let before = tables.len();
        tables.retain(|_, table| {
            let stale = removed.iter().any(|name| table.depends_on(name));
            if stale {
                table.invalidate();
            }
            !stale
        });
        before - tables.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.tables.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orb_core::{AttributeEntry, InterfaceEntry, ModuleId, PrimitiveKind, TypeRef};

    fn registry(ifaces: Vec<InterfaceEntry>) -> TypeRegistry {
        let mut registry = TypeRegistry::with_builtins();
        for iface in ifaces {
            registry.register(iface.into(), ModuleId::HOST).unwrap();
        }
        registry
    }

    fn method(name: &str) -> MethodSignature {
        MethodSignature::new(name, TypeRef::VOID)
    }

    #[test]
    fn no_bases_keeps_declaration_order() {
        let registry = registry(vec![
            InterfaceEntry::new("test.XA")
                .with_method(method("c"))
                .with_method(method("a"))
                .with_method(method("b")),
        ]);
        let table = DispatchTable::build(&registry, &"test.XA".into()).unwrap();
        assert_eq!(table.method_names(), vec!["c", "a", "b"]);
    }

    #[test]
    fn attributes_follow_methods() {
        let registry = registry(vec![
            InterfaceEntry::new("test.XA")
                .with_attribute(AttributeEntry::new("Title", PrimitiveKind::String.into()))
                .with_attribute(AttributeEntry::new("Id", PrimitiveKind::Long.into()).readonly())
                .with_method(method("close")),
        ]);
        let table = DispatchTable::build(&registry, &"test.XA".into()).unwrap();
        assert_eq!(table.method_names(), vec!["close", "getTitle", "setTitle", "getId"]);
        assert_eq!(table.slots()[3].kind, MemberKind::AttributeGetter("Id".into()));
    }

    #[test]
    fn diamond_root_appears_once() {
        let registry = registry(vec![
            InterfaceEntry::new("test.XTop").with_method(method("top")),
            InterfaceEntry::new("test.XLeft").with_base("test.XTop").with_method(method("left")),
            InterfaceEntry::new("test.XRight").with_base("test.XTop").with_method(method("right")),
            InterfaceEntry::new("test.XBottom")
                .with_base("test.XLeft")
                .with_base("test.XRight")
                .with_method(method("bottom")),
        ]);
        let table = DispatchTable::build(&registry, &"test.XBottom".into()).unwrap();
        assert_eq!(table.method_names(), vec!["bottom", "left", "top", "right"]);
        assert_eq!(table.slots()[2].declared_in.to_string(), "test.XTop");
        assert!(table.depends_on(&"test.XTop".into()));
    }

    #[test]
    fn incompatible_redeclaration_is_ambiguous() {
        let registry = registry(vec![
            InterfaceEntry::new("test.XA").with_method(method("run")),
            InterfaceEntry::new("test.XB")
                .with_method(MethodSignature::new("run", PrimitiveKind::Long.into())),
            InterfaceEntry::new("test.XC").with_base("test.XA").with_base("test.XB"),
        ]);
        let err = DispatchTable::build(&registry, &"test.XC".into()).unwrap_err();
        assert_eq!(
            err,
            OrbError::Dispatch(DispatchError::AmbiguousMethod {
                interface: "test.XC".into(),
                method: "run".into(),
            })
        );
    }

    #[test]
    fn merged_slot_raises_union() {
        let registry = registry(vec![
            InterfaceEntry::new("test.XA").with_method(method("run").raises("test.ErrA")),
            InterfaceEntry::new("test.XB")
                .with_method(method("run").raises("test.ErrB").raises("test.ErrA")),
            InterfaceEntry::new("test.XC").with_base("test.XA").with_base("test.XB"),
        ]);
        let table = DispatchTable::build(&registry, &"test.XC".into()).unwrap();
        assert_eq!(table.len(), 1);
        let raises: Vec<String> = table.slots()[0]
            .signature
            .raises
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(raises, vec!["test.ErrA", "test.ErrB"]);
        assert_eq!(table.slots()[0].declared_in.to_string(), "test.XA");
    }

    #[test]
    fn cycle_is_reported() {
        let registry = registry(vec![
            InterfaceEntry::new("test.XA").with_base("test.XB"),
            InterfaceEntry::new("test.XB").with_base("test.XA"),
        ]);
        let err = DispatchTable::build(&registry, &"test.XA".into()).unwrap_err();
        assert!(matches!(
            err,
            OrbError::Dispatch(DispatchError::CyclicInheritance { .. })
        ));
    }

    #[test]
    fn cache_invalidation_marks_tables_stale() {
        let registry = registry(vec![InterfaceEntry::new("test.XA").with_method(method("a"))]);
        let cache = DispatchCache::default();
        let table = cache.get_or_build(&registry, &"test.XA".into()).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.invalidate(&["test.XA".into()]), 1);
        assert!(!table.is_valid());
        assert!(table.ensure_valid().is_err());
        assert_eq!(cache.len(), 0);
    }
}
