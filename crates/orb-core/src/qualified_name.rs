use std::fmt;

/// Fully-qualified name of a registered type.
///
/// Used as the primary key of the type registry. Segments are joined with `.`
/// the way IDL module paths are written (`orb.frame.Desktop`).
///
/// # Examples
///
/// ```
/// use orb_core::QualifiedName;
///
/// // Top-level name
/// let root = QualifiedName::global("XInterface");
/// assert_eq!(root.to_string(), "XInterface");
///
/// // With module path
/// let desktop = QualifiedName::new("Desktop", vec!["orb".into(), "frame".into()]);
/// assert_eq!(desktop.to_string(), "orb.frame.Desktop");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    /// Simple name (e.g., "Desktop", "XComponent")
    pub name: String,
    /// Module path (e.g., ["orb", "frame"])
    /// Empty for top-level names
    pub namespace: Vec<String>,
}

impl QualifiedName {
    /// Segment separator used by `Display` and `from_qualified_string`.
    pub const SEPARATOR: char = '.';

    /// Create a new qualified name with a module path.
    pub fn new(name: impl Into<String>, namespace: Vec<String>) -> Self {
        Self {
            name: name.into(),
            namespace,
        }
    }

    /// Create a qualified name at the top level.
    pub fn global(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Vec::new(),
        }
    }

    /// Create from a dotted string (e.g., "orb.frame.Desktop").
    ///
    /// The last segment is the name, the rest is the module path. Empty
    /// segments are dropped, so a leading or doubled separator is ignored.
    pub fn from_qualified_string(s: &str) -> Self {
        let mut parts: Vec<String> = s
            .split(Self::SEPARATOR)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        match parts.pop() {
            Some(name) => Self {
                name,
                namespace: parts,
            },
            None => Self::global(""),
        }
    }

    /// Build a name from a full segment path (module path + simple name).
    ///
    /// Returns `None` for an empty path.
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Option<Self> {
        let (last, rest) = segments.split_last()?;
        Some(Self {
            name: last.as_ref().to_string(),
            namespace: rest.iter().map(|s| s.as_ref().to_string()).collect(),
        })
    }

    /// Check if this name has no module path.
    pub fn is_global(&self) -> bool {
        self.namespace.is_empty()
    }

    /// Get the simple (unqualified) name.
    pub fn simple_name(&self) -> &str {
        &self.name
    }

    /// Get the module path.
    pub fn namespace_path(&self) -> &[String] {
        &self.namespace
    }

    /// Get the module path as a dotted string.
    pub fn namespace_string(&self) -> String {
        self.namespace.join(".")
    }

    /// Iterate over every segment, module path first.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.namespace
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.name.as_str()))
    }

    /// Compute the TypeHash for this name.
    ///
    /// Note: This formats the name. Cache the result if called repeatedly.
    pub fn to_type_hash(&self) -> crate::TypeHash {
        crate::TypeHash::from_name(&self.to_string())
    }

    /// Create a child name nested inside this one.
    ///
    /// Example: `orb.frame` + `Desktop` = `orb.frame.Desktop`
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut child_ns = self.namespace.clone();
        child_ns.push(self.name.clone());
        Self {
            name: name.into(),
            namespace: child_ns,
        }
    }

    /// Get the enclosing name (if any).
    ///
    /// Example: `orb.awt.FontWeight.BOLD` -> Some(`orb.awt.FontWeight`)
    pub fn parent(&self) -> Option<Self> {
        let (last, rest) = self.namespace.split_last()?;
        Some(Self {
            name: last.clone(),
            namespace: rest.to_vec(),
        })
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.namespace.join("."), self.name)
        }
    }
}

impl From<&str> for QualifiedName {
    fn from(s: &str) -> Self {
        Self::from_qualified_string(s)
    }
}

impl From<String> for QualifiedName {
    fn from(s: String) -> Self {
        Self::from_qualified_string(&s)
    }
}

impl From<&QualifiedName> for QualifiedName {
    fn from(name: &QualifiedName) -> Self {
        name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_name() {
        let name = QualifiedName::global("XInterface");
        assert_eq!(name.name, "XInterface");
        assert!(name.is_global());
        assert_eq!(name.to_string(), "XInterface");
    }

    #[test]
    fn namespaced_name() {
        let name = QualifiedName::new("Desktop", vec!["orb".into(), "frame".into()]);
        assert_eq!(name.namespace, vec!["orb", "frame"]);
        assert!(!name.is_global());
        assert_eq!(name.to_string(), "orb.frame.Desktop");
    }

    #[test]
    fn from_qualified_string() {
        let name = QualifiedName::from_qualified_string("orb.frame.Desktop");
        assert_eq!(name.name, "Desktop");
        assert_eq!(name.namespace, vec!["orb", "frame"]);

        let top = QualifiedName::from_qualified_string("long");
        assert!(top.is_global());
    }

    #[test]
    fn from_qualified_string_drops_empty_segments() {
        let a = QualifiedName::from_qualified_string(".orb..frame.Desktop");
        let b = QualifiedName::from_qualified_string("orb.frame.Desktop");
        assert_eq!(a, b);

        let empty = QualifiedName::from_qualified_string(".");
        assert_eq!(empty.name, "");
        assert!(empty.is_global());
    }

    #[test]
    fn segments_round_trip() {
        let name = QualifiedName::from_qualified_string("orb.awt.FontWeight");
        let segments: Vec<&str> = name.segments().collect();
        assert_eq!(segments, vec!["orb", "awt", "FontWeight"]);
        assert_eq!(QualifiedName::from_segments(&segments), Some(name));
        assert_eq!(QualifiedName::from_segments::<&str>(&[]), None);
    }

    #[test]
    fn child_and_parent() {
        let group = QualifiedName::from_qualified_string("orb.awt.FontWeight");
        let member = group.child("BOLD");
        assert_eq!(member.to_string(), "orb.awt.FontWeight.BOLD");
        assert_eq!(member.parent(), Some(group));
        assert!(QualifiedName::global("long").parent().is_none());
    }
}
