//! Interface type entry.
//!
//! This module provides [`InterfaceEntry`] together with the method and
//! attribute descriptions it is made of.

use std::fmt;

use bitflags::bitflags;

use crate::{QualifiedName, TypeHash, TypeRef};

/// Parameter passing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParamDirection {
    /// Caller to callee only.
    #[default]
    In,
    /// Callee to caller only; the slot is empty on entry.
    Out,
    /// Both ways; the caller's value is visible on entry and replaced on return.
    InOut,
}

impl ParamDirection {
    /// Whether the callee sees the caller's value.
    pub fn reads(self) -> bool {
        matches!(self, ParamDirection::In | ParamDirection::InOut)
    }

    /// Whether the callee's value is written back to the caller.
    pub fn writes(self) -> bool {
        matches!(self, ParamDirection::Out | ParamDirection::InOut)
    }

    fn tag(self) -> u64 {
        match self {
            ParamDirection::In => 0,
            ParamDirection::Out => 0x5a5a_0000_0000_0001,
            ParamDirection::InOut => 0xa5a5_0000_0000_0002,
        }
    }
}

impl fmt::Display for ParamDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParamDirection::In => "in",
            ParamDirection::Out => "out",
            ParamDirection::InOut => "inout",
        })
    }
}

/// A method or constructor parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Param {
    pub name: String,
    pub ty: TypeRef,
    pub direction: ParamDirection,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: TypeRef, direction: ParamDirection) -> Self {
        Self {
            name: name.into(),
            ty,
            direction,
        }
    }

    /// An `in` parameter.
    pub fn input(name: impl Into<String>, ty: TypeRef) -> Self {
        Self::new(name, ty, ParamDirection::In)
    }

    /// Hash used for signature identity (type + direction, name excluded).
    pub fn signature_hash(&self) -> TypeHash {
        TypeHash(self.ty.type_hash().0 ^ self.direction.tag())
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}", self.direction, self.ty, self.name)
    }
}

bitflags! {
    /// Method modifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MethodFlags: u8 {
        /// Fire-and-forget call; must return void and have no out parameters.
        const ONEWAY = 1 << 0;
    }
}

bitflags! {
    /// Attribute modifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AttributeFlags: u8 {
        /// No setter slot.
        const READONLY = 1 << 0;
        /// Changes are broadcast to property listeners.
        const BOUND = 1 << 1;
    }
}

/// A method signature declared on an interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    /// Method name.
    pub name: String,
    /// Parameters in declaration order.
    pub params: Vec<Param>,
    /// Return type.
    pub return_type: TypeRef,
    /// Declared exception types.
    pub raises: Vec<QualifiedName>,
    /// Modifiers.
    pub flags: MethodFlags,
}

impl MethodSignature {
    /// Create a method with no parameters.
    pub fn new(name: impl Into<String>, return_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            return_type,
            raises: Vec::new(),
            flags: MethodFlags::empty(),
        }
    }

    /// Append an `in` parameter.
    pub fn param(self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.with_param(Param::new(name, ty, ParamDirection::In))
    }

    /// Append an `out` parameter.
    pub fn out_param(self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.with_param(Param::new(name, ty, ParamDirection::Out))
    }

    /// Append an `inout` parameter.
    pub fn inout_param(self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.with_param(Param::new(name, ty, ParamDirection::InOut))
    }

    /// Append a parameter.
    pub fn with_param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Declare an exception type.
    pub fn raises(mut self, exception: impl Into<QualifiedName>) -> Self {
        self.raises.push(exception.into());
        self
    }

    /// Mark as oneway.
    pub fn oneway(mut self) -> Self {
        self.flags |= MethodFlags::ONEWAY;
        self
    }

    pub fn is_oneway(&self) -> bool {
        self.flags.contains(MethodFlags::ONEWAY)
    }

    /// Signature identity hash: name and parameter types with directions.
    ///
    /// The return type and declared exceptions are not part of the identity;
    /// two declarations with the same identity but a different return type
    /// are incompatible rather than distinct.
    pub fn signature_hash(&self) -> TypeHash {
        let params: Vec<TypeHash> = self.params.iter().map(Param::signature_hash).collect();
        TypeHash::from_signature(&self.name, &params)
    }

    /// Whether two declarations of the same method name can share a slot.
    ///
    /// Raises clauses are not compared; a shared slot raises the union.
    pub fn is_compatible_with(&self, other: &MethodSignature) -> bool {
        self.name == other.name
            && self.return_type == other.return_type
            && self.flags == other.flags
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.ty == b.ty && a.direction == b.direction)
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_oneway() {
            write!(f, "[oneway] ")?;
        }
        write!(f, "{} {}(", self.return_type, self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{p}")?;
        }
        write!(f, ")")?;
        if !self.raises.is_empty() {
            let raises: Vec<String> = self.raises.iter().map(ToString::to_string).collect();
            write!(f, " raises ({})", raises.join(", "))?;
        }
        Ok(())
    }
}

/// An interface attribute, exposed through accessor slots.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeEntry {
    pub name: String,
    pub ty: TypeRef,
    pub flags: AttributeFlags,
    /// Exceptions the getter may raise.
    pub get_raises: Vec<QualifiedName>,
    /// Exceptions the setter may raise.
    pub set_raises: Vec<QualifiedName>,
}

impl AttributeEntry {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            flags: AttributeFlags::empty(),
            get_raises: Vec::new(),
            set_raises: Vec::new(),
        }
    }

    pub fn readonly(mut self) -> Self {
        self.flags |= AttributeFlags::READONLY;
        self
    }

    pub fn bound(mut self) -> Self {
        self.flags |= AttributeFlags::BOUND;
        self
    }

    pub fn is_readonly(&self) -> bool {
        self.flags.contains(AttributeFlags::READONLY)
    }

    /// Name of the getter slot.
    pub fn getter_name(&self) -> String {
        format!("get{}", self.name)
    }

    /// Name of the setter slot.
    pub fn setter_name(&self) -> String {
        format!("set{}", self.name)
    }

    /// Getter signature: `T get<Name>()`.
    pub fn getter(&self) -> MethodSignature {
        MethodSignature {
            name: self.getter_name(),
            params: Vec::new(),
            return_type: self.ty.clone(),
            raises: self.get_raises.clone(),
            flags: MethodFlags::empty(),
        }
    }

    /// Setter signature: `void set<Name>([in] T value)`, absent for read-only attributes.
    pub fn setter(&self) -> Option<MethodSignature> {
        if self.is_readonly() {
            return None;
        }
        Some(MethodSignature {
            name: self.setter_name(),
            params: vec![Param::input("value", self.ty.clone())],
            return_type: TypeRef::VOID,
            raises: self.set_raises.clone(),
            flags: MethodFlags::empty(),
        })
    }
}

/// What an interface member slot stands for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// A declared method.
    Method,
    /// Getter of the named attribute.
    AttributeGetter(String),
    /// Setter of the named attribute.
    AttributeSetter(String),
}

/// Registry entry for an interface type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceEntry {
    /// Fully qualified name.
    pub name: QualifiedName,
    /// Type hash for identity.
    pub type_hash: TypeHash,
    /// Directly inherited interfaces, in declaration order.
    pub bases: Vec<QualifiedName>,
    /// Declared methods, in declaration order.
    pub methods: Vec<MethodSignature>,
    /// Declared attributes, in declaration order.
    pub attributes: Vec<AttributeEntry>,
}

impl InterfaceEntry {
    /// Create an interface with no members.
    pub fn new(name: impl Into<QualifiedName>) -> Self {
        let name = name.into();
        let type_hash = name.to_type_hash();
        Self {
            name,
            type_hash,
            bases: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Add a base interface.
    pub fn with_base(mut self, base: impl Into<QualifiedName>) -> Self {
        self.bases.push(base.into());
        self
    }

    /// Add a method.
    pub fn with_method(mut self, method: MethodSignature) -> Self {
        self.methods.push(method);
        self
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, attribute: AttributeEntry) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Find a declared method by name.
    pub fn find_method(&self, name: &str) -> Option<&MethodSignature> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Check if this interface directly inherits `base`.
    pub fn has_base(&self, base: &QualifiedName) -> bool {
        self.bases.contains(base)
    }

    /// Own member slots: declared methods, then attribute accessors.
    pub fn own_members(&self) -> Vec<(MemberKind, MethodSignature)> {
        let mut members: Vec<(MemberKind, MethodSignature)> = self
            .methods
            .iter()
            .map(|m| (MemberKind::Method, m.clone()))
            .collect();
        for attr in &self.attributes {
            members.push((MemberKind::AttributeGetter(attr.name.clone()), attr.getter()));
            if let Some(setter) = attr.setter() {
                members.push((MemberKind::AttributeSetter(attr.name.clone()), setter));
            }
        }
        members
    }
}
