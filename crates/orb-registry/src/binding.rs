//! Binding export: the registry projected into a namespace tree.
//!
//! Internal nodes are namespace segments. Leaves are handles an embedding
//! environment feeds back into the runtime: a type handle (resolve it), a
//! factory handle (instantiate through it) or a constant value. Every map is
//! a `BTreeMap`, so two exports of the same registry are identical and
//! render identically.
//!
//! ```text
//! orb
//!   Exception: exception
//!   RuntimeError: exception
//!   XInterface: interface
//! test
//!   Color: enum
//!     RED = 0
//!   Desktop: service
//!     create(): factory
//! ```

use std::collections::BTreeMap;
use std::fmt;

use orb_core::{ConstantValue, QualifiedName, TypeDescriptor, TypeHash, TypeKind};

use crate::TypeRegistry;

/// A handle exported for one name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingLeaf {
    /// A registered type.
    Type {
        name: QualifiedName,
        kind: TypeKind,
        hash: TypeHash,
    },
    /// A member of a constant group or enum.
    Constant { name: QualifiedName, value: ConstantValue },
    /// Constructor entry point of a service or singleton.
    Factory {
        service: QualifiedName,
        constructor: String,
        /// Number of constructors sharing this name.
        overloads: usize,
    },
}

impl BindingLeaf {
    /// Qualified name the leaf resolves through.
    pub fn name(&self) -> QualifiedName {
        match self {
            BindingLeaf::Type { name, .. } | BindingLeaf::Constant { name, .. } => name.clone(),
            BindingLeaf::Factory {
                service,
                constructor,
                ..
            } => service.child(constructor.clone()),
        }
    }
}

impl fmt::Display for BindingLeaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingLeaf::Type { kind, .. } => write!(f, "{kind}"),
            BindingLeaf::Constant { value, .. } => write!(f, "= {value}"),
            BindingLeaf::Factory { overloads, .. } if *overloads > 1 => {
                write!(f, "factory ({overloads} overloads)")
            }
            BindingLeaf::Factory { .. } => f.write_str("factory"),
        }
    }
}

/// One name in the export tree. A node may carry a leaf and children at
/// once: an enum exposes its members below its own type handle.
///
/// When two handles land on the same path (a type `a.Svc.create` next to the
/// `create` factory of service `a.Svc`), the type handle is the node's leaf
/// and the other one is kept in `shadowed`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingNode {
    pub leaf: Option<BindingLeaf>,
    pub shadowed: Vec<BindingLeaf>,
    pub children: BTreeMap<String, BindingNode>,
}

impl BindingNode {
    fn child_mut(&mut self, segment: &str) -> &mut BindingNode {
        self.children.entry(segment.to_string()).or_default()
    }

    fn insert(&mut self, path: &[&str], leaf: BindingLeaf) {
        let mut node = self;
        for segment in path {
            node = node.child_mut(segment);
        }
        let Some(existing) = node.leaf.take() else {
            node.leaf = Some(leaf);
            return;
        };
        let keep_existing = matches!(existing, BindingLeaf::Type { .. })
            || !matches!(leaf, BindingLeaf::Type { .. });
        let (kept, other) = if keep_existing {
            (existing, leaf)
        } else {
            (leaf, existing)
        };
        log::warn!(
            "binding path {} is shared by {} and {}",
            path.join("."),
            kept.name(),
            other.name()
        );
        node.leaf = Some(kept);
        node.shadowed.push(other);
    }
}

/// Namespace tree of exported handles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingExport {
    root: BindingNode,
}

impl BindingExport {
    /// Build the export for everything currently registered.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn from_registry(registry: &TypeRegistry) -> Self {
        let mut root = BindingNode::default();

        for (name, kind) in registry.tree().walk() {
            let Some(desc) = registry.get(&name) else {
                log::warn!("namespace tree lists {name}, which is not registered");
                continue;
            };
            let path: Vec<&str> = name.segments().collect();
            root.insert(
                &path,
                BindingLeaf::Type {
                    name: name.clone(),
                    kind,
                    hash: desc.type_hash(),
                },
            );

            match desc {
                TypeDescriptor::Constants(group) => {
                    for (member, value) in &group.values {
                        insert_child(&mut root, &path, member, BindingLeaf::Constant {
                            name: name.child(member.clone()),
                            value: *value,
                        });
                    }
                }
                TypeDescriptor::Enum(e) => {
                    for member in &e.values {
                        insert_child(&mut root, &path, &member.name, BindingLeaf::Constant {
                            name: name.child(member.name.clone()),
                            value: ConstantValue::Long(member.value),
                        });
                    }
                }
                TypeDescriptor::Service(svc) | TypeDescriptor::Singleton(svc) => {
                    let mut overloads: BTreeMap<&str, usize> = BTreeMap::new();
                    for ctor in &svc.constructors {
                        *overloads.entry(ctor.name.as_str()).or_default() += 1;
                    }
                    for (ctor, count) in overloads {
                        insert_child(&mut root, &path, ctor, BindingLeaf::Factory {
                            service: name.clone(),
                            constructor: ctor.to_string(),
                            overloads: count,
                        });
                    }
                }
                _ => {}
            }
        }

        Self { root }
    }

    pub fn root(&self) -> &BindingNode {
        &self.root
    }

    /// Find the node at a dotted path (`"test.Color.RED"`).
    pub fn lookup(&self, path: &str) -> Option<&BindingNode> {
        path.split('.')
            .try_fold(&self.root, |node, segment| node.children.get(segment))
    }

    /// Find the leaf at a dotted path.
    pub fn lookup_leaf(&self, path: &str) -> Option<&BindingLeaf> {
        self.lookup(path)?.leaf.as_ref()
    }

    /// Every leaf with its dotted path, in tree order. Shadowed leaves follow
    /// the leaf of their node.
    pub fn leaves(&self) -> Vec<(String, &BindingLeaf)> {
        fn collect<'a>(node: &'a BindingNode, prefix: &str, out: &mut Vec<(String, &'a BindingLeaf)>) {
            for (segment, child) in &node.children {
                let path = if prefix.is_empty() {
                    segment.clone()
                } else {
                    format!("{prefix}.{segment}")
                };
                for leaf in child.leaf.iter().chain(&child.shadowed) {
                    out.push((path.clone(), leaf));
                }
                collect(child, &path, out);
            }
        }

        let mut out = Vec::new();
        collect(&self.root, "", &mut out);
        out
    }

    pub fn len(&self) -> usize {
        self.leaves().len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }
}

fn insert_child(root: &mut BindingNode, path: &[&str], segment: &str, leaf: BindingLeaf) {
    let mut full = path.to_vec();
    full.push(segment);
    root.insert(&full, leaf);
}

impl fmt::Display for BindingExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn render(node: &BindingNode, depth: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            for (segment, child) in &node.children {
                let indent = "  ".repeat(depth);
                match &child.leaf {
                    Some(leaf @ BindingLeaf::Constant { .. }) => {
                        writeln!(f, "{indent}{segment} {leaf}")?
                    }
                    Some(leaf) => writeln!(f, "{indent}{segment}: {leaf}")?,
                    None => writeln!(f, "{indent}{segment}")?,
                }
                render(child, depth + 1, f)?;
            }
            Ok(())
        }
        render(&self.root, 0, f)
    }
}
