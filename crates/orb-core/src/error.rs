//! Unified error types for the component runtime.
//!
//! ## Error Hierarchy
//!
//! ```text
//! OrbError (top-level wrapper)
//! ├── RegistrationError - Type registration and lookup
//! ├── DispatchError     - Dispatch table construction and call marshalling
//! ├── ObjectError       - Reference counting and handle validity
//! ├── FactoryError      - Service resolution and instantiation
//! ├── ModuleError       - Module load/unload
//! └── TypedException    - Failures raised by native code
//! ```
//!
//! Each phase-specific error can be matched directly, or converted into
//! [`OrbError`] with `?`.

use thiserror::Error;

use crate::runtime::Value;
use crate::QualifiedName;

// ============================================================================
// Registration Errors
// ============================================================================

/// Errors from registering or resolving types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    /// The name is registered with a different description. The existing entry is kept.
    #[error("duplicate type: {name} is already registered with a different description")]
    DuplicateType { name: String },

    /// No type with this name is registered.
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// The type is malformed or refers to something of the wrong kind.
    #[error("invalid type '{name}': {reason}")]
    InvalidType { name: String, reason: String },

    /// A declaration string could not be parsed.
    #[error("invalid declaration '{decl}': {reason}")]
    InvalidDeclaration { decl: String, reason: String },

    /// The group exists but has no such member.
    #[error("unknown constant '{member}' in {group}")]
    UnknownConstant { group: String, member: String },
}

impl RegistrationError {
    /// True for both a missing type and a missing constant member.
    pub fn is_unknown(&self) -> bool {
        matches!(
            self,
            RegistrationError::UnknownType(_) | RegistrationError::UnknownConstant { .. }
        )
    }

    pub fn invalid_type(name: impl ToString, reason: impl Into<String>) -> Self {
        RegistrationError::InvalidType {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Dispatch Errors
// ============================================================================

/// Errors from building dispatch tables and marshalling calls.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    /// Two declarations of the same method name disagree.
    #[error("ambiguous method '{method}' in {interface}: incompatible declarations")]
    AmbiguousMethod { interface: String, method: String },

    #[error("cyclic inheritance through {interface}")]
    CyclicInheritance { interface: String },

    #[error("{0} is not an interface")]
    NotAnInterface(String),

    #[error("{interface} has no method '{method}'")]
    UnknownMethod { interface: String, method: String },

    #[error("slot {index} out of range (table has {count} slots)")]
    SlotOutOfRange { index: usize, count: usize },

    #[error("'{method}' expects {expected} arguments, got {actual}")]
    ArityMismatch {
        method: String,
        expected: usize,
        actual: usize,
    },

    #[error("argument {index} of '{method}': expected {expected}, got {actual}")]
    ArgumentMismatch {
        method: String,
        index: usize,
        expected: String,
        actual: String,
    },

    /// The native implementation returned something other than the declared type.
    #[error("'{method}' returned {actual}, declared {expected}")]
    ReturnMismatch {
        method: String,
        expected: String,
        actual: String,
    },

    /// The target object does not implement the table's interface.
    #[error("object does not implement {interface}")]
    InterfaceNotImplemented { interface: String },

    /// The table was built from types that have since been unloaded.
    #[error("dispatch table for {interface} is stale")]
    StaleTable { interface: String },
}

// ============================================================================
// Object Errors
// ============================================================================

/// Errors from reference counting and handle validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObjectError {
    /// The handle's object has already been destroyed.
    #[error("use after free: object {index} generation {generation} has been destroyed")]
    UseAfterFree { index: u32, generation: u32 },

    /// The handle does not name a heap slot.
    #[error("invalid handle: no object at index {index}")]
    InvalidHandle { index: u32 },
}

// ============================================================================
// Factory Errors
// ============================================================================

/// Errors from service resolution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FactoryError {
    /// Not a registered service or singleton.
    #[error("unknown service: {0}")]
    UnknownService(String),

    #[error("no constructor '{constructor}' of {service} accepts {arity} arguments of the given types")]
    NoMatchingConstructor {
        service: String,
        constructor: String,
        arity: usize,
    },

    /// The service is described but no module provides a factory for it.
    #[error("no factory bound for {service}")]
    FactoryNotBound { service: String },

    /// A factory produced an instance of an implementation nobody registered.
    #[error("unknown implementation: {0}")]
    UnknownImplementation(String),
}

// ============================================================================
// Module Errors
// ============================================================================

/// Errors from loading and unloading modules.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModuleError {
    /// Unload refused while objects allocated by the module are alive.
    #[error("module '{module}' is busy: {live} live objects")]
    ModuleBusy { module: String, live: usize },

    #[error("unknown module: {0}")]
    UnknownModule(String),

    #[error("module '{0}' is already loaded")]
    AlreadyLoaded(String),

    #[error("module '{module}' was built for ABI version {found}, runtime expects {expected}")]
    IncompatibleAbi {
        module: String,
        found: u32,
        expected: u32,
    },

    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

// ============================================================================
// Typed Exceptions
// ============================================================================

/// An exception instance resolved against a registered exception type.
///
/// `fields` holds every field of the type's base chain, root first, with
/// defaults for anything the native side did not set. `Message` is always
/// present.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{type_name}: {message}")]
pub struct TypedException {
    pub type_name: QualifiedName,
    pub message: String,
    pub fields: Vec<(String, Value)>,
}

impl TypedException {
    pub fn new(type_name: impl Into<QualifiedName>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Check the exception's exact type.
    pub fn is(&self, type_name: &str) -> bool {
        self.type_name.to_string() == type_name
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// The unified error type for all runtime operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrbError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Object(#[from] ObjectError),

    #[error(transparent)]
    Factory(#[from] FactoryError),

    #[error(transparent)]
    Module(#[from] ModuleError),

    #[error(transparent)]
    Exception(#[from] TypedException),
}

impl OrbError {
    pub fn is_registration(&self) -> bool {
        matches!(self, OrbError::Registration(_))
    }

    pub fn is_dispatch(&self) -> bool {
        matches!(self, OrbError::Dispatch(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, OrbError::Object(_))
    }

    pub fn is_factory(&self) -> bool {
        matches!(self, OrbError::Factory(_))
    }

    pub fn is_module(&self) -> bool {
        matches!(self, OrbError::Module(_))
    }

    /// The typed exception, if native code failed.
    pub fn as_exception(&self) -> Option<&TypedException> {
        match self {
            OrbError::Exception(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_error_display() {
        let err = RegistrationError::DuplicateType {
            name: "orb.frame.XDesktop".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "duplicate type: orb.frame.XDesktop is already registered with a different description"
        );
    }

    #[test]
    fn unknown_constant_counts_as_unknown() {
        let err = RegistrationError::UnknownConstant {
            group: "orb.awt.FontWeight".into(),
            member: "HEAVY".into(),
        };
        assert!(err.is_unknown());
        assert!(!RegistrationError::invalid_type("x", "y").is_unknown());
    }

    #[test]
    fn unified_conversions() {
        let err: OrbError = ObjectError::InvalidHandle { index: 3 }.into();
        assert!(err.is_object());

        let err: OrbError = ModuleError::from(RegistrationError::UnknownType("a.B".into())).into();
        assert!(err.is_module());
        assert_eq!(err.to_string(), "unknown type: a.B");

        let err: OrbError = TypedException::new("orb.RuntimeError", "boom").into();
        assert_eq!(err.as_exception().map(|e| e.message.as_str()), Some("boom"));
    }

    #[test]
    fn typed_exception_display() {
        let exc = TypedException::new("orb.io.IOException", "closed");
        assert_eq!(exc.to_string(), "orb.io.IOException: closed");
        assert!(exc.is("orb.io.IOException"));
    }
}
