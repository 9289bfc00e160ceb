//! Namespace Tree - hierarchical view of the registry.
//!
//! Uses `petgraph::StableDiGraph` with:
//! - Nodes: `NamespaceData` (the types declared directly in that namespace)
//! - Edges: `Contains(name)` from a namespace to each child namespace
//!
//! The flat name map in [`TypeRegistry`](crate::TypeRegistry) is the source
//! of truth; the tree mirrors it for ordered enumeration and export. Node
//! indices stay valid across removals, so namespaces left empty by an unload
//! can be pruned without renumbering the rest.

use std::collections::BTreeMap;

use orb_core::{QualifiedName, TypeKind};
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;

/// Edge types in the namespace graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceEdge {
    /// Parent namespace contains child namespace.
    /// The String is the child's simple name.
    Contains(String),
}

impl NamespaceEdge {
    fn name(&self) -> &str {
        match self {
            NamespaceEdge::Contains(name) => name,
        }
    }
}

/// Data stored in each namespace node.
#[derive(Debug, Default)]
pub struct NamespaceData {
    /// Types in this namespace by simple name, ordered.
    pub types: BTreeMap<String, TypeKind>,
}

/// The namespace graph.
pub struct NamespaceTree {
    graph: StableDiGraph<NamespaceData, NamespaceEdge>,
    root: NodeIndex,
}

impl Default for NamespaceTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceTree {
    /// Create a new namespace tree with an empty root.
    pub fn new() -> Self {
        let mut graph = StableDiGraph::new();
        let root = graph.add_node(NamespaceData::default());
        Self { graph, root }
    }

    /// Get the root namespace node index.
    pub fn root(&self) -> NodeIndex {
        self.root
    }

    /// Get a namespace node's data.
    pub fn get_namespace(&self, node: NodeIndex) -> Option<&NamespaceData> {
        self.graph.node_weight(node)
    }

    /// Find a child namespace by name.
    pub fn find_child(&self, parent: NodeIndex, name: &str) -> Option<NodeIndex> {
        self.graph
            .edges(parent)
            .find(|edge| edge.weight().name() == name)
            .map(|edge| edge.target())
    }

    /// Get or create a child namespace.
    pub fn get_or_create_child(&mut self, parent: NodeIndex, name: &str) -> NodeIndex {
        if let Some(child) = self.find_child(parent, name) {
            return child;
        }

        let child = self.graph.add_node(NamespaceData::default());
        self.graph
            .add_edge(parent, child, NamespaceEdge::Contains(name.to_string()));
        child
    }

    /// Get or create a namespace path from root.
    pub fn get_or_create_path<S: AsRef<str>>(&mut self, path: &[S]) -> NodeIndex {
        let mut current = self.root;
        for segment in path {
            current = self.get_or_create_child(current, segment.as_ref());
        }
        current
    }

    /// Get an existing namespace by path, or None if it doesn't exist.
    pub fn get_path<S: AsRef<str>>(&self, path: &[S]) -> Option<NodeIndex> {
        let mut current = self.root;
        for segment in path {
            current = self.find_child(current, segment.as_ref())?;
        }
        Some(current)
    }

    /// Find the parent namespace of a node.
    pub fn find_parent(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .edges_directed(node, Direction::Incoming)
            .next()
            .map(|edge| edge.source())
    }

    /// Get the simple name of a namespace node.
    pub fn get_namespace_name(&self, node: NodeIndex) -> Option<&str> {
        if node == self.root {
            return None;
        }
        self.graph
            .edges_directed(node, Direction::Incoming)
            .next()
            .map(|edge| edge.weight().name())
    }

    /// Get the full namespace path for a node.
    pub fn get_namespace_path(&self, node: NodeIndex) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = node;

        while current != self.root {
            if let Some(name) = self.get_namespace_name(current) {
                path.push(name.to_string());
            }
            match self.find_parent(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }

        path.reverse();
        path
    }

    /// Child namespaces of `node`, sorted by name.
    pub fn children(&self, node: NodeIndex) -> Vec<(&str, NodeIndex)> {
        let mut children: Vec<(&str, NodeIndex)> = self
            .graph
            .edges(node)
            .map(|edge| (edge.weight().name(), edge.target()))
            .collect();
        children.sort_by(|a, b| a.0.cmp(b.0));
        children
    }

    // ========================================================================
    // Type Placement
    // ========================================================================

    /// Record a type in its namespace.
    ///
    /// IDL module declarations also create the namespace they name.
    pub fn insert_type(&mut self, name: &QualifiedName, kind: TypeKind) {
        let ns_node = self.get_or_create_path(name.namespace_path());
        if kind == TypeKind::Module {
            self.get_or_create_child(ns_node, name.simple_name());
        }
        if let Some(data) = self.graph.node_weight_mut(ns_node) {
            data.types.insert(name.simple_name().to_string(), kind);
        }
    }

    /// Forget a type and prune namespaces left empty.
    pub fn remove_type(&mut self, name: &QualifiedName) {
        let Some(ns_node) = self.get_path(name.namespace_path()) else {
            return;
        };
        if let Some(data) = self.graph.node_weight_mut(ns_node) {
            data.types.remove(name.simple_name());
        }
        if let Some(own) = self.find_child(ns_node, name.simple_name()) {
            self.prune(own);
        }
        self.prune(ns_node);
    }

    /// Remove `node` and its empty ancestors.
    fn prune(&mut self, mut node: NodeIndex) {
        while node != self.root && self.is_empty_namespace(node) {
            let parent = self.find_parent(node);
            self.graph.remove_node(node);
            match parent {
                Some(p) => node = p,
                None => break,
            }
        }
    }

    fn is_empty_namespace(&self, node: NodeIndex) -> bool {
        let no_types = self
            .graph
            .node_weight(node)
            .is_some_and(|data| data.types.is_empty());
        no_types && self.graph.edges(node).next().is_none()
    }

    /// Kind of the type recorded under `name`.
    pub fn kind_of(&self, name: &QualifiedName) -> Option<TypeKind> {
        let ns_node = self.get_path(name.namespace_path())?;
        self.graph
            .node_weight(ns_node)?
            .types
            .get(name.simple_name())
            .copied()
    }

    /// Every type in the tree, depth-first with namespaces and names in order.
    pub fn walk(&self) -> Vec<(QualifiedName, TypeKind)> {
        let mut out = Vec::new();
        self.walk_from(self.root, &mut Vec::new(), &mut out);
        out
    }

    fn walk_from(
        &self,
        node: NodeIndex,
        path: &mut Vec<String>,
        out: &mut Vec<(QualifiedName, TypeKind)>,
    ) {
        if let Some(data) = self.graph.node_weight(node) {
            for (name, kind) in &data.types {
                out.push((QualifiedName::new(name.clone(), path.clone()), *kind));
            }
        }
        for (name, child) in self.children(node) {
            path.push(name.to_string());
            self.walk_from(child, path, out);
            path.pop();
        }
    }

    /// Number of namespace nodes, root included.
    pub fn namespace_count(&self) -> usize {
        self.graph.node_count()
    }
}

impl std::fmt::Debug for NamespaceTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespaceTree")
            .field("namespaces", &self.graph.node_count())
            .finish()
    }
}
