//! Service and singleton entries.
//!
//! A service names an implementation that can be instantiated through one of
//! its constructors. New-style services also name the interface the created
//! object implements. Singletons share the same layout; the factory resolver
//! constructs them at most once.

use std::fmt;

use crate::{QualifiedName, TypeHash};

use super::{MethodSignature, Param};

/// A named service constructor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstructorEntry {
    /// Constructor name (`create`, `createWithURL`, ...).
    pub name: String,
    /// Fixed parameters. Constructors only take `in` parameters.
    pub params: Vec<Param>,
    /// Name of a trailing `any...` parameter collecting every remaining argument.
    pub rest: Option<String>,
    /// Declared exception types.
    pub raises: Vec<QualifiedName>,
}

impl ConstructorEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            rest: None,
            raises: Vec::new(),
        }
    }

    /// Append a parameter.
    pub fn with_param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Accept any number of trailing `any` arguments.
    pub fn with_rest(mut self, name: impl Into<String>) -> Self {
        self.rest = Some(name.into());
        self
    }

    /// Declare an exception type.
    pub fn raises(mut self, exception: impl Into<QualifiedName>) -> Self {
        self.raises.push(exception.into());
        self
    }

    /// Whether `count` arguments satisfy this constructor's arity.
    pub fn accepts_arity(&self, count: usize) -> bool {
        if self.rest.is_some() {
            count >= self.params.len()
        } else {
            count == self.params.len()
        }
    }

    /// Identity hash under the owning service.
    pub fn constructor_hash(&self, service: TypeHash) -> TypeHash {
        let params: Vec<TypeHash> = self.params.iter().map(Param::signature_hash).collect();
        TypeHash::from_constructor(service, &self.name, &params)
    }

    /// Convert a method signature (as produced by the declaration parser).
    pub fn from_signature(sig: MethodSignature) -> Self {
        Self {
            name: sig.name,
            params: sig.params,
            rest: None,
            raises: sig.raises,
        }
    }
}

impl fmt::Display for ConstructorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        let mut first = true;
        for p in &self.params {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{} {}", p.ty, p.name)?;
        }
        if let Some(rest) = &self.rest {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "any... {rest}")?;
        }
        write!(f, ")")
    }
}

/// Registry entry for a service or singleton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEntry {
    /// Fully qualified name.
    pub name: QualifiedName,
    /// Type hash for identity.
    pub type_hash: TypeHash,
    /// Interface implemented by created objects, if declared.
    pub interface: Option<QualifiedName>,
    /// Constructors in declaration order.
    pub constructors: Vec<ConstructorEntry>,
}

impl ServiceEntry {
    pub fn new(name: impl Into<QualifiedName>) -> Self {
        let name = name.into();
        let type_hash = name.to_type_hash();
        Self {
            name,
            type_hash,
            interface: None,
            constructors: Vec::new(),
        }
    }

    /// Declare the implemented interface.
    pub fn implementing(mut self, interface: impl Into<QualifiedName>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    /// Add a constructor.
    pub fn with_constructor(mut self, constructor: ConstructorEntry) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// Constructors with the given name, in declaration order.
    pub fn constructors_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a ConstructorEntry> + 'a {
        self.constructors.iter().filter(move |c| c.name == name)
    }
}
